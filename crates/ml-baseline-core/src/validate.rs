//! Validation and alignment of serve-time input against an `InputSchema`
//!
//! Checks run in a fixed sequence (see [`AlignmentStep::SEQUENCE`]):
//! forbidden columns, then missing columns, then reordering, type coercion
//! and identifier extraction. A caller who leaks the label therefore gets
//! the forbidden-column diagnosis even when features are also missing.

use std::collections::BTreeSet;

use crate::error::{BaselineError, Result, Violation};
use crate::schema::InputSchema;
use crate::table::{Column, Table};

/// One stage of `validate_and_align`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentStep {
    /// Fail if any forbidden column is present
    ForbiddenColumns,
    /// Fail if any required feature is absent
    MissingColumns,
    /// Select required features in schema order, dropping extras
    Reorder,
    /// Coerce each feature to its declared type bucket
    Coerce,
    /// Copy present identifier columns into the passthrough table
    ExtractIds,
}

impl AlignmentStep {
    /// Execution order of the steps
    pub const SEQUENCE: [AlignmentStep; 5] = [
        AlignmentStep::ForbiddenColumns,
        AlignmentStep::MissingColumns,
        AlignmentStep::Reorder,
        AlignmentStep::Coerce,
        AlignmentStep::ExtractIds,
    ];
}

/// Features ready for scoring plus the identifier columns to carry through
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    /// Exactly the required features, in schema order
    pub features: Table,
    /// Identifier columns present in the input, in input order
    pub passthrough: Table,
}

/// Validate `input` against `schema` and align it for scoring
pub fn validate_and_align(input: &Table, schema: &InputSchema) -> Result<ValidatedBatch> {
    let mut alignment = Alignment::new(input, schema);
    for step in AlignmentStep::SEQUENCE {
        alignment.run(step)?;
    }
    Ok(alignment.finish())
}

/// Working state threaded through the alignment steps
struct Alignment<'a> {
    input: &'a Table,
    schema: &'a InputSchema,
    features: Table,
    passthrough: Table,
}

impl<'a> Alignment<'a> {
    fn new(input: &'a Table, schema: &'a InputSchema) -> Self {
        Self {
            input,
            schema,
            features: Table::with_rows(input.n_rows()),
            passthrough: Table::with_rows(input.n_rows()),
        }
    }

    fn run(&mut self, step: AlignmentStep) -> Result<()> {
        match step {
            AlignmentStep::ForbiddenColumns => self.check_forbidden(),
            AlignmentStep::MissingColumns => self.check_missing(),
            AlignmentStep::Reorder => self.reorder(),
            AlignmentStep::Coerce => self.coerce(),
            AlignmentStep::ExtractIds => self.extract_ids(),
        }
    }

    fn check_forbidden(&self) -> Result<()> {
        let present: Vec<String> = self
            .schema
            .forbidden_columns()
            .iter()
            .filter(|c| self.input.has_column(c))
            .cloned()
            .collect();
        if present.is_empty() {
            Ok(())
        } else {
            Err(Violation::ForbiddenColumns(present).into())
        }
    }

    fn check_missing(&self) -> Result<()> {
        let missing: Vec<String> = self
            .schema
            .required_feature_columns()
            .iter()
            .filter(|c| !self.input.has_column(c))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Violation::MissingColumns(missing).into())
        }
    }

    fn reorder(&mut self) -> Result<()> {
        let required = self.schema.required_feature_columns();
        let known: BTreeSet<&str> = required
            .iter()
            .chain(self.schema.optional_id_columns())
            .map(String::as_str)
            .collect();
        let extra: Vec<&str> = self
            .input
            .column_names()
            .into_iter()
            .filter(|c| !known.contains(c))
            .collect();
        if !extra.is_empty() {
            tracing::warn!(columns = ?extra, "Discarding columns not in schema");
        }

        self.features = self.input.select(required)?;
        Ok(())
    }

    fn coerce(&mut self) -> Result<()> {
        let mut coerced = Table::with_rows(self.features.n_rows());
        let mut failures = Vec::new();

        for column in self.features.columns() {
            let dtype = self.schema.dtype_of(&column.name).ok_or_else(|| {
                BaselineError::Internal(format!("no dtype recorded for '{}'", column.name))
            })?;
            match dtype.coerce(column) {
                Ok(data) => coerced.push_column(Column::new(column.name.clone(), data))?,
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            return Err(Violation::Coercion(failures).into());
        }
        self.features = coerced;
        Ok(())
    }

    fn extract_ids(&mut self) -> Result<()> {
        let ids = self.schema.optional_id_columns();
        for column in self.input.columns() {
            if ids.contains(&column.name) {
                self.passthrough.push_column(column.clone())?;
            }
        }
        Ok(())
    }

    fn finish(self) -> ValidatedBatch {
        ValidatedBatch {
            features: self.features,
            passthrough: self.passthrough,
        }
    }
}
