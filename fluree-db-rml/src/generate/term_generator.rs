//! Term generator
//!
//! Resolves a [`TermMap`] once, at build time, into an expression strategy
//! (constant, reference, template, function) and a term kind (IRI, blank
//! node, literal with its modifier). Generation then never re-inspects the
//! raw term map.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use oxilangtag::LanguageTag;
use oxiri::Iri;
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{RmlError, RmlResult};
use crate::function::{FunctionExecution, FunctionRegistry};
use crate::mapper::TriplesMapper;
use crate::mapping::{TermMap, TermType};
use crate::source::{lexical_values, DatatypeLookup, ExpressionEvaluation};
use crate::term::RdfTerm;
use crate::vocab::xsd;

use super::{BuildContext, Template};

/// Where a generated term is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermPosition {
    Subject,
    Predicate,
    Object,
    Graph,
    Datatype,
    Language,
}

impl TermPosition {
    /// Check whether a term type may be generated in this position
    pub fn allows(self, term_type: TermType) -> bool {
        match self {
            TermPosition::Subject => matches!(term_type, TermType::Iri | TermType::BlankNode),
            TermPosition::Predicate | TermPosition::Graph | TermPosition::Datatype => {
                term_type == TermType::Iri
            }
            TermPosition::Object => true,
            TermPosition::Language => term_type == TermType::Literal,
        }
    }

    /// Term type used when the term map declares none
    fn default_term_type(self, term_map: &TermMap) -> TermType {
        match self {
            TermPosition::Object
                if term_map.reference.is_some()
                    || term_map.function_value.is_some()
                    || term_map.datatype_map.is_some()
                    || term_map.language_map.is_some() =>
            {
                TermType::Literal
            }
            TermPosition::Language => TermType::Literal,
            _ => TermType::Iri,
        }
    }
}

impl fmt::Display for TermPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TermPosition::Subject => "subject",
            TermPosition::Predicate => "predicate",
            TermPosition::Object => "object",
            TermPosition::Graph => "graph",
            TermPosition::Datatype => "datatype",
            TermPosition::Language => "language",
        })
    }
}

#[derive(Debug)]
enum Expression {
    Constant(RdfTerm),
    Reference(String),
    Template(Template),
    Function(FunctionCall),
}

#[derive(Debug)]
enum TermKind {
    Iri { base_iri: Option<Arc<str>> },
    BlankNode,
    Literal(LiteralModifier),
}

/// Only one modifier family is ever active for a literal
#[derive(Debug)]
enum LiteralModifier {
    Language(Box<TermGenerator>),
    Datatype(Box<TermGenerator>),
    /// Use the source's datatype hint, if any
    Hint,
}

#[derive(Debug)]
struct FunctionCall {
    execution: Box<TriplesMapper>,
    functions: Arc<FunctionRegistry>,
}

/// Generates the terms of one term map for each record
#[derive(Debug)]
pub struct TermGenerator {
    rule: Arc<str>,
    expression: Expression,
    kind: TermKind,
}

impl TermGenerator {
    /// Validate a term map for a position and resolve its strategy
    pub fn new(term_map: &TermMap, position: TermPosition, ctx: &BuildContext) -> RmlResult<Self> {
        let rule: Arc<str> = Arc::from(term_map.rule_id());

        match term_map.expression_count() {
            1 => {}
            0 => {
                return Err(RmlError::config(
                    &*rule,
                    "term map has no constant, reference, template or function value",
                ))
            }
            n => {
                return Err(RmlError::config(
                    &*rule,
                    format!("term map has {n} expressions, expected exactly one"),
                ))
            }
        }

        if let Some(constant) = &term_map.constant {
            let term_type = TermType::of(constant);
            if !position.allows(term_type) {
                return Err(RmlError::config(
                    &*rule,
                    format!("constant {constant} is not allowed in {position} position"),
                ));
            }
            return Ok(Self {
                rule,
                expression: Expression::Constant(constant.clone()),
                // never consulted for constants
                kind: TermKind::BlankNode,
            });
        }

        let term_type = term_map
            .term_type
            .unwrap_or_else(|| position.default_term_type(term_map));
        if !position.allows(term_type) {
            return Err(RmlError::config(
                &*rule,
                format!("term type {term_type:?} is not allowed in {position} position"),
            ));
        }
        if term_type != TermType::Literal
            && (term_map.language_map.is_some() || term_map.datatype_map.is_some())
        {
            return Err(RmlError::config(
                &*rule,
                "datatype and language maps require a literal term type",
            ));
        }

        let expression = match (
            &term_map.reference,
            &term_map.template,
            &term_map.function_value,
        ) {
            (Some(reference), _, _) => Expression::Reference(reference.clone()),
            (_, Some(template), _) => Expression::Template(Template::parse(template)?),
            (_, _, Some(function)) => Expression::Function(FunctionCall {
                execution: Box::new(TriplesMapper::for_function(function, ctx)?),
                functions: Arc::clone(&ctx.functions),
            }),
            _ => return Err(RmlError::config(&*rule, "term map has no expression")),
        };

        let kind = match term_type {
            TermType::Iri => TermKind::Iri {
                base_iri: ctx.base_iri.clone(),
            },
            TermType::BlankNode => TermKind::BlankNode,
            TermType::Literal => TermKind::Literal(literal_modifier(term_map, &rule, ctx)?),
        };

        Ok(Self {
            rule,
            expression,
            kind,
        })
    }

    /// Rule identity used in errors
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Check whether generation calls a registered function
    pub fn is_function_valued(&self) -> bool {
        if matches!(self.expression, Expression::Function(_)) {
            return true;
        }
        match &self.kind {
            TermKind::Literal(LiteralModifier::Language(g))
            | TermKind::Literal(LiteralModifier::Datatype(g)) => g.is_function_valued(),
            _ => false,
        }
    }

    /// Generate the terms for one record, in generation order without duplicates
    pub fn generate(
        &self,
        eval: &dyn ExpressionEvaluation,
        datatypes: &dyn DatatypeLookup,
    ) -> RmlResult<IndexSet<RdfTerm>> {
        let lexicals: Vec<(String, Option<String>)> = match &self.expression {
            Expression::Constant(term) => return Ok(IndexSet::from([term.clone()])),
            Expression::Reference(reference) => {
                let hint = datatypes.datatype(reference);
                self.evaluate(eval, reference)?
                    .into_iter()
                    .map(|v| (v, hint.clone()))
                    .collect()
            }
            Expression::Template(template) => {
                let iri_safe = matches!(self.kind, TermKind::Iri { .. });
                template
                    .expand(|reference| self.evaluate(eval, reference), iri_safe)?
                    .into_iter()
                    .map(|v| (v, None))
                    .collect()
            }
            Expression::Function(call) => call.invoke(&self.rule, eval, datatypes)?,
        };

        if lexicals.is_empty() {
            return Ok(IndexSet::new());
        }
        self.terms(lexicals, eval, datatypes)
    }

    fn evaluate(&self, eval: &dyn ExpressionEvaluation, reference: &str) -> RmlResult<Vec<String>> {
        eval.evaluate(reference).map(lexical_values).map_err(|e| {
            RmlError::term_generation(&*self.rule, format!("evaluating {reference:?}: {e}"))
        })
    }

    fn terms(
        &self,
        lexicals: Vec<(String, Option<String>)>,
        eval: &dyn ExpressionEvaluation,
        datatypes: &dyn DatatypeLookup,
    ) -> RmlResult<IndexSet<RdfTerm>> {
        let mut terms = IndexSet::with_capacity(lexicals.len());

        match &self.kind {
            TermKind::Iri { base_iri } => {
                for (lexical, _) in lexicals {
                    terms.insert(self.resolve_iri(lexical, base_iri.as_deref())?);
                }
            }
            TermKind::BlankNode => {
                for (lexical, _) in lexicals {
                    let id = blank_node_id(&lexical);
                    if !id.is_empty() {
                        terms.insert(RdfTerm::BlankNode(id));
                    }
                }
            }
            TermKind::Literal(LiteralModifier::Language(language)) => {
                let tags = language.generate(eval, datatypes)?;
                for tag in &tags {
                    if LanguageTag::parse(tag.lexical()).is_err() {
                        return Err(RmlError::InvalidLanguageTag {
                            rule: self.rule.to_string(),
                            tag: tag.lexical().to_string(),
                        });
                    }
                }
                for (lexical, _) in lexicals {
                    for tag in &tags {
                        terms.insert(RdfTerm::lang_string(lexical.clone(), tag.lexical()));
                    }
                }
            }
            TermKind::Literal(LiteralModifier::Datatype(datatype)) => {
                let datatypes = datatype.generate(eval, datatypes)?;
                for (lexical, _) in lexicals {
                    for dt in &datatypes {
                        terms.insert(RdfTerm::typed(lexical.clone(), dt.lexical()));
                    }
                }
            }
            TermKind::Literal(LiteralModifier::Hint) => {
                for (lexical, hint) in lexicals {
                    terms.insert(match hint {
                        Some(dt) => RdfTerm::typed(lexical, dt),
                        None => RdfTerm::string(lexical),
                    });
                }
            }
        }

        Ok(terms)
    }

    fn resolve_iri(&self, lexical: String, base_iri: Option<&str>) -> RmlResult<RdfTerm> {
        if Iri::parse(lexical.as_str()).is_ok() {
            return Ok(RdfTerm::Iri(lexical));
        }
        if let Some(base) = base_iri {
            let joined = format!("{base}{lexical}");
            if Iri::parse(joined.as_str()).is_ok() {
                return Ok(RdfTerm::Iri(joined));
            }
        }
        Err(RmlError::InvalidIri {
            rule: self.rule.to_string(),
            value: lexical,
        })
    }
}

fn literal_modifier(
    term_map: &TermMap,
    rule: &str,
    ctx: &BuildContext,
) -> RmlResult<LiteralModifier> {
    match (&term_map.language_map, &term_map.datatype_map) {
        (Some(language), datatype) => {
            if datatype.is_some() {
                warn!(
                    rule,
                    "term map declares both a language map and a datatype map, ignoring the datatype map"
                );
            }
            Ok(LiteralModifier::Language(Box::new(TermGenerator::new(
                language,
                TermPosition::Language,
                ctx,
            )?)))
        }
        (None, Some(datatype)) => Ok(LiteralModifier::Datatype(Box::new(TermGenerator::new(
            datatype,
            TermPosition::Datatype,
            ctx,
        )?))),
        (None, None) => Ok(LiteralModifier::Hint),
    }
}

/// Keep only `[A-Za-z0-9_-]`
fn blank_node_id(lexical: &str) -> String {
    lexical
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

impl FunctionCall {
    fn invoke(
        &self,
        rule: &str,
        eval: &dyn ExpressionEvaluation,
        datatypes: &dyn DatatypeLookup,
    ) -> RmlResult<Vec<(String, Option<String>)>> {
        let description = self.execution.map_record(eval, datatypes)?;
        let executions = FunctionExecution::from_description(description).ok_or_else(|| {
            RmlError::term_generation(rule, "function value does not name a function")
        })?;

        let mut values = Vec::new();
        for execution in &executions {
            let function = self.functions.get(&execution.function).ok_or_else(|| {
                RmlError::UnregisteredFunction {
                    rule: rule.to_string(),
                    function: execution.function.clone(),
                }
            })?;
            trace!(rule, function = %execution.function, "invoking function");
            let returned = function
                .execute(execution)
                .map_err(|e| RmlError::term_generation(rule, e.to_string()))?;
            for value in returned {
                push_returned(value, &mut values);
            }
        }
        Ok(values)
    }
}

/// Adapt a function's return value to lexical forms with datatype hints
fn push_returned(value: Value, out: &mut Vec<(String, Option<String>)>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                push_returned(item, out);
            }
        }
        Value::String(s) => out.push((s, None)),
        Value::Bool(b) => out.push((b.to_string(), Some(xsd::BOOLEAN.to_string()))),
        Value::Number(n) => {
            let datatype = if n.is_f64() { xsd::DOUBLE } else { xsd::INTEGER };
            out.push((n.to_string(), Some(datatype.to_string())));
        }
        obj @ Value::Object(_) => out.push((obj.to_string(), None)),
    }
}
