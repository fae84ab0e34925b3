//! Ref-object maps and join conditions

/// Object map whose objects are the subjects of another TriplesMap
///
/// ```turtle
/// <#City> rml:predicateObjectMap [
///     rml:predicate ex:country ;
///     rml:objectMap [
///         rml:parentTriplesMap <#Country> ;
///         rml:joinCondition [ rml:child "cc" ; rml:parent "code" ]
///     ]
/// ] .
/// ```
///
/// Every city record links to the subject of each country record whose
/// `code` equals the city's `cc`. With several join conditions a parent
/// record must satisfy all of them.
#[derive(Debug, Clone)]
pub struct RefObjectMap {
    /// Rule identity, if the mapping document names this node
    pub id: Option<String>,
    /// Id of the parent TriplesMap
    pub parent_triples_map: String,
    /// Join conditions (ANDed; none means "same record" for a shared source)
    pub join_conditions: Vec<JoinCondition>,
}

impl RefObjectMap {
    /// Create a new RefObjectMap with a single join condition
    pub fn new(
        parent_triples_map: impl Into<String>,
        child_reference: impl Into<String>,
        parent_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            parent_triples_map: parent_triples_map.into(),
            join_conditions: vec![JoinCondition::new(child_reference, parent_reference)],
        }
    }

    /// Create a RefObjectMap with multiple join conditions (composite key)
    pub fn with_conditions(
        parent_triples_map: impl Into<String>,
        conditions: Vec<JoinCondition>,
    ) -> Self {
        Self {
            id: None,
            parent_triples_map: parent_triples_map.into(),
            join_conditions: conditions,
        }
    }

    /// Create a RefObjectMap without join conditions
    pub fn unconditional(parent_triples_map: impl Into<String>) -> Self {
        Self::with_conditions(parent_triples_map, Vec::new())
    }

    /// Set the rule identity
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a join condition
    pub fn add_condition(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.join_conditions.push(JoinCondition::new(child, parent));
    }

    /// Get all child references used in join conditions
    pub fn child_references(&self) -> Vec<&str> {
        self.join_conditions
            .iter()
            .map(|jc| jc.child_reference.as_str())
            .collect()
    }

    /// Get all parent references used in join conditions
    pub fn parent_references(&self) -> Vec<&str> {
        self.join_conditions
            .iter()
            .map(|jc| jc.parent_reference.as_str())
            .collect()
    }

    /// Check if this RefObjectMap has any join conditions
    pub fn has_conditions(&self) -> bool {
        !self.join_conditions.is_empty()
    }
}

/// A single join condition
///
/// Specifies that a value of the child reference in the current record must
/// equal a value of the parent reference in a parent TriplesMap record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinCondition {
    /// Reference evaluated against the current (child) TriplesMap's records
    pub child_reference: String,
    /// Reference evaluated against the parent TriplesMap's records
    pub parent_reference: String,
}

impl JoinCondition {
    /// Create a new join condition
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child_reference: child.into(),
            parent_reference: parent.into(),
        }
    }
}
