// AdsFlow - GAQL query builder
// Caller-supplied values never get spliced into a query raw: IDs must be
// all-digit and string literals are escaped.

use crate::error::WorkflowError;

/// Ensure `value` is a plain numeric ID before it goes into a query.
pub fn numeric_id<'a>(field: &str, value: &'a str) -> Result<&'a str, WorkflowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(WorkflowError::validation(format!(
            "{} must be a numeric ID, got '{}'",
            field, value
        )));
    }
    Ok(trimmed)
}

/// Quote a string literal for GAQL (single quotes, backslash escapes).
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

#[derive(Debug, Clone)]
pub struct Query {
    fields: Vec<&'static str>,
    resource: &'static str,
    conditions: Vec<String>,
    order_by: Option<&'static str>,
    limit: Option<u32>,
}

impl Query {
    pub fn select(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
            resource: "",
            conditions: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn from(mut self, resource: &'static str) -> Self {
        self.resource = resource;
        self
    }

    /// Condition built only from constants (e.g. `campaign.status != 'REMOVED'`).
    pub fn filter(mut self, condition: &'static str) -> Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// `field = <id>` after numeric validation.
    pub fn where_id(mut self, field: &'static str, id: &str) -> Result<Self, WorkflowError> {
        let id = numeric_id(field, id)?;
        self.conditions.push(format!("{} = {}", field, id));
        Ok(self)
    }

    /// `field IN (<id>, ...)`; every ID is validated and the list must not be empty.
    pub fn where_ids_in(mut self, field: &'static str, ids: &[String]) -> Result<Self, WorkflowError> {
        if ids.is_empty() {
            return Err(WorkflowError::validation(format!("{} needs at least one ID", field)));
        }
        let ids = ids
            .iter()
            .map(|id| numeric_id(field, id))
            .collect::<Result<Vec<_>, WorkflowError>>()?;
        self.conditions.push(format!("{} IN ({})", field, ids.join(", ")));
        Ok(self)
    }

    /// `field = '<escaped>'`.
    pub fn where_str(mut self, field: &'static str, value: &str) -> Self {
        self.conditions.push(format!("{} = {}", field, string_literal(value)));
        self
    }

    pub fn order_by(mut self, clause: &'static str) -> Self {
        self.order_by = Some(clause);
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn build(&self) -> String {
        let mut q = format!("SELECT {} FROM {}", self.fields.join(", "), self.resource);
        if !self.conditions.is_empty() {
            q.push_str(" WHERE ");
            q.push_str(&self.conditions.join(" AND "));
        }
        if let Some(order) = self.order_by {
            q.push_str(" ORDER BY ");
            q.push_str(order);
        }
        if let Some(n) = self.limit {
            q.push_str(&format!(" LIMIT {}", n));
        }
        q
    }
}
