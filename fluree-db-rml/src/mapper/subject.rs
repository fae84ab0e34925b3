//! Subject mapper

use indexmap::IndexSet;
use oxiri::Iri;

use crate::error::{RmlError, RmlResult};
use crate::generate::{BuildContext, TermGenerator, TermPosition};
use crate::mapping::SubjectMap;
use crate::source::{DatatypeLookup, ExpressionEvaluation};
use crate::term::{RdfTerm, Statement};
use crate::vocab::rdf;

use super::{generate_graphs, or_default_graph};

/// Output of a subject map for one record
#[derive(Debug, Clone)]
pub struct SubjectMapping {
    pub subjects: IndexSet<RdfTerm>,
    /// Graphs declared by the subject map; empty means none were declared
    pub graphs: IndexSet<Option<RdfTerm>>,
    /// `rdf:type` statements for the subject map's classes
    pub type_statements: Vec<Statement>,
}

/// Generates subjects, their graphs and class statements
#[derive(Debug)]
pub struct SubjectMapper {
    subject: TermGenerator,
    classes: Vec<RdfTerm>,
    graphs: Vec<TermGenerator>,
}

impl SubjectMapper {
    pub fn new(subject_map: &SubjectMap, ctx: &BuildContext) -> RmlResult<Self> {
        let subject = TermGenerator::new(&subject_map.term_map, TermPosition::Subject, ctx)?;

        let classes = subject_map
            .classes
            .iter()
            .map(|class| match Iri::parse(class.as_str()) {
                Ok(_) => Ok(RdfTerm::iri(class.as_str())),
                Err(e) => Err(RmlError::config(
                    subject.rule(),
                    format!("class {class:?} is not an absolute IRI: {e}"),
                )),
            })
            .collect::<RmlResult<Vec<_>>>()?;

        let graphs = subject_map
            .graph_maps
            .iter()
            .map(|g| TermGenerator::new(g, TermPosition::Graph, ctx))
            .collect::<RmlResult<Vec<_>>>()?;

        Ok(Self {
            subject,
            classes,
            graphs,
        })
    }

    /// Map one record
    ///
    /// Returns `None` when the record produces no subject, in which case
    /// nothing else should be generated for it.
    pub fn map(
        &self,
        eval: &dyn ExpressionEvaluation,
        datatypes: &dyn DatatypeLookup,
    ) -> RmlResult<Option<SubjectMapping>> {
        let subjects = self.subject.generate(eval, datatypes)?;
        if subjects.is_empty() {
            return Ok(None);
        }

        let graphs = generate_graphs(&self.graphs, eval, datatypes)?;

        let mut type_statements = Vec::new();
        if !self.classes.is_empty() {
            let rdf_type = RdfTerm::iri(rdf::TYPE);
            let type_graphs = or_default_graph(graphs.clone());
            for subject in &subjects {
                for class in &self.classes {
                    for graph in &type_graphs {
                        type_statements.push(Statement::new(
                            subject.clone(),
                            rdf_type.clone(),
                            class.clone(),
                            graph.clone(),
                        ));
                    }
                }
            }
        }

        Ok(Some(SubjectMapping {
            subjects,
            graphs,
            type_statements,
        }))
    }

    /// Check whether any generator calls a function
    pub fn is_function_valued(&self) -> bool {
        self.subject.is_function_valued() || self.graphs.iter().any(|g| g.is_function_valued())
    }
}
