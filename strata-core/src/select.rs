use crate::{Error, GenericSqlWriter, Result, SqlWriter, separated_by};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Default, Debug, Clone)]
struct Source {
    table: String,
    alias: String,
    columns: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Join {
    join_type: JoinType,
    source: Source,
    condition: String,
}

/// Accumulates the clauses of one SELECT statement.
///
/// The builder never executes anything, [`Select::assemble`] renders the SQL
/// text. Conditions and expressions are trusted SQL fragments, values must
/// already be rendered (see [`SqlWriter::write_expr`]).
///
/// ```rust
/// use strata_core::Select;
/// let mut select = Select::new();
/// select
///     .from("product", "e", &[])
///     .where_("e.price > 10")
///     .order("e.name ASC")
///     .limit(5);
/// assert_eq!(
///     select.assemble().unwrap(),
///     "SELECT e.*\nFROM product AS e\nWHERE (e.price > 10)\nORDER BY e.name ASC\nLIMIT 5"
/// );
/// ```
#[derive(Default, Debug, Clone)]
pub struct Select {
    from: Option<Source>,
    joins: Vec<Join>,
    wheres: Vec<String>,
    orders: Vec<String>,
    limit: u64,
    offset: u64,
}

impl Select {
    pub fn new() -> Self {
        Default::default()
    }

    /// Clears every clause.
    pub fn init(&mut self) -> &mut Self {
        *self = Default::default();
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.init()
    }

    /// Sets the source of the query.
    ///
    /// `columns` maps output aliases to source expressions, empty selects
    /// every column of the source.
    pub fn from(
        &mut self,
        table: impl Into<String>,
        alias: impl Into<String>,
        columns: &[(&str, &str)],
    ) -> &mut Self {
        self.from = Some(Source {
            table: table.into(),
            alias: alias.into(),
            columns: owned_columns(columns),
        });
        self
    }

    pub fn inner_join(
        &mut self,
        alias: impl Into<String>,
        table: impl Into<String>,
        condition: impl Into<String>,
        columns: &[(&str, &str)],
    ) -> &mut Self {
        self.join(JoinType::Inner, alias.into(), table.into(), condition.into(), columns)
    }

    pub fn left_join(
        &mut self,
        alias: impl Into<String>,
        table: impl Into<String>,
        condition: impl Into<String>,
        columns: &[(&str, &str)],
    ) -> &mut Self {
        self.join(JoinType::Left, alias.into(), table.into(), condition.into(), columns)
    }

    fn join(
        &mut self,
        join_type: JoinType,
        alias: String,
        table: String,
        condition: String,
        columns: &[(&str, &str)],
    ) -> &mut Self {
        // First registration wins
        if !self.has_join(&alias) {
            self.joins.push(Join {
                join_type,
                source: Source {
                    table,
                    alias,
                    columns: owned_columns(columns),
                },
                condition,
            });
        }
        self
    }

    pub fn has_join(&self, alias: &str) -> bool {
        self.joins.iter().any(|v| v.source.alias == alias)
    }

    /// Appends a condition, all the conditions are AND-ed.
    pub fn where_(&mut self, condition: impl Into<String>) -> &mut Self {
        self.wheres.push(condition.into());
        self
    }

    pub fn order(&mut self, expr: impl Into<String>) -> &mut Self {
        self.orders.push(expr.into());
        self
    }

    /// Zero removes the clause.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = limit;
        self
    }

    /// Zero removes the clause.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn assemble(&self) -> Result<String> {
        self.assemble_with(&GenericSqlWriter::new())
    }

    pub fn assemble_with(&self, writer: &dyn SqlWriter) -> Result<String> {
        let Some(from) = &self.from else {
            return Err(Error::msg("The select has no FROM clause"));
        };
        if from.table.is_empty() {
            return Err(Error::msg("The select FROM clause has an empty table"));
        }
        let mut out = String::with_capacity(256);
        out.push_str("SELECT ");
        if from.columns.is_empty() {
            out.push_str(if from.alias.is_empty() {
                &from.table
            } else {
                &from.alias
            });
            out.push_str(".*");
        } else {
            write_columns(&mut out, from);
        }
        for join in self.joins.iter().filter(|v| !v.source.columns.is_empty()) {
            out.push_str(", ");
            write_columns(&mut out, &join.source);
        }
        out.push_str("\nFROM ");
        write_source(&mut out, from);
        for join in &self.joins {
            out.push_str(match join.join_type {
                JoinType::Inner => "\nINNER JOIN ",
                JoinType::Left => "\nLEFT JOIN ",
            });
            write_source(&mut out, &join.source);
            out.push_str(" ON ");
            out.push_str(&join.condition);
        }
        if !self.wheres.is_empty() {
            out.push_str("\nWHERE ");
            separated_by(
                &mut out,
                &self.wheres,
                |out, v| {
                    out.push('(');
                    out.push_str(v);
                    out.push(')');
                },
                " AND ",
            );
        }
        if !self.orders.is_empty() {
            out.push_str("\nORDER BY ");
            separated_by(&mut out, &self.orders, |out, v| out.push_str(v), ", ");
        }
        writer.write_limit_offset(&mut out, self.limit, self.offset);
        Ok(out)
    }

    /// Counts the rows the query would return, ignoring LIMIT and OFFSET.
    pub fn count_query(&self, writer: &dyn SqlWriter) -> Result<String> {
        let mut select = self.clone();
        select.limit(0).offset(0);
        Ok(format!(
            "SELECT COUNT(*) FROM ({}) AS t",
            select.assemble_with(writer)?
        ))
    }
}

fn owned_columns(columns: &[(&str, &str)]) -> Vec<(String, String)> {
    columns
        .iter()
        .map(|(alias, expr)| (alias.to_string(), expr.to_string()))
        .collect()
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_columns(out: &mut String, source: &Source) {
    separated_by(
        out,
        &source.columns,
        |out, (alias, expr)| {
            if is_identifier(expr) && !source.alias.is_empty() {
                out.push_str(&source.alias);
                out.push('.');
            }
            out.push_str(expr);
            if !alias.is_empty() && alias != expr {
                out.push_str(" AS ");
                out.push_str(alias);
            }
        },
        ", ",
    );
}

fn write_source(out: &mut String, source: &Source) {
    out.push_str(&source.table);
    if !source.alias.is_empty() {
        out.push_str(" AS ");
        out.push_str(&source.alias);
    }
}
