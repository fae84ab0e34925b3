//! Predicate-object mapper

use std::sync::Arc;

use indexmap::IndexSet;

use crate::error::RmlResult;
use crate::generate::TermGenerator;
use crate::source::{DatatypeLookup, ExpressionEvaluation};
use crate::term::{RdfTerm, Statement};

use super::ref_object::RefObjectMapper;
use super::subject::SubjectMapping;
use super::{generate_graphs, or_default_graph};

/// Maps one predicate-object map of a triples map
#[derive(Debug)]
pub struct PredicateObjectMapper {
    predicates: Vec<TermGenerator>,
    objects: Vec<TermGenerator>,
    ref_objects: Vec<Arc<RefObjectMapper>>,
    graphs: Vec<TermGenerator>,
}

impl PredicateObjectMapper {
    pub fn new(
        predicates: Vec<TermGenerator>,
        objects: Vec<TermGenerator>,
        ref_objects: Vec<Arc<RefObjectMapper>>,
        graphs: Vec<TermGenerator>,
    ) -> Self {
        Self {
            predicates,
            objects,
            ref_objects,
            graphs,
        }
    }

    /// Ref-object mappers fed by this group
    pub fn ref_objects(&self) -> &[Arc<RefObjectMapper>] {
        &self.ref_objects
    }

    /// Map one record, appending joinless statements to `out`
    ///
    /// Ref-object maps only capture the record; their statements are emitted
    /// when the join resolves.
    pub fn map(
        &self,
        subject: &SubjectMapping,
        eval: &dyn ExpressionEvaluation,
        datatypes: &dyn DatatypeLookup,
        out: &mut Vec<Statement>,
    ) -> RmlResult<()> {
        let mut predicates: IndexSet<RdfTerm> = IndexSet::new();
        for generator in &self.predicates {
            predicates.extend(generator.generate(eval, datatypes)?);
        }
        if predicates.is_empty() {
            return Ok(());
        }

        let mut graphs = subject.graphs.clone();
        graphs.extend(generate_graphs(&self.graphs, eval, datatypes)?);
        let graphs = or_default_graph(graphs);

        let mut objects: IndexSet<RdfTerm> = IndexSet::new();
        for generator in &self.objects {
            objects.extend(generator.generate(eval, datatypes)?);
        }

        for s in &subject.subjects {
            for p in &predicates {
                for o in &objects {
                    for g in &graphs {
                        out.push(Statement::new(s.clone(), p.clone(), o.clone(), g.clone()));
                    }
                }
            }
        }

        for rom in &self.ref_objects {
            rom.capture(&subject.subjects, &graphs, &predicates, eval)?;
        }

        Ok(())
    }

    /// Check whether any generator calls a function
    pub fn is_function_valued(&self) -> bool {
        self.predicates
            .iter()
            .chain(&self.objects)
            .chain(&self.graphs)
            .any(TermGenerator::is_function_valued)
    }
}
