use crate::{
    Error, FieldMap, Result, Value, separated_by, truncate_long,
    value::{write_date, write_time},
};
use std::{collections::BTreeSet, fmt::Write};

/// Dialect aware SQL rendering.
///
/// Every method has a default producing ANSI-ish SQL, a driver overrides
/// only what its backend does differently.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        if value.is_null() {
            return self.write_value_none(out);
        }
        let _ = match value {
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int8(Some(v)) => drop(write!(out, "{v}")),
            Value::Int16(Some(v)) => drop(write!(out, "{v}")),
            Value::Int32(Some(v)) => drop(write!(out, "{v}")),
            Value::Int64(Some(v)) => drop(write!(out, "{v}")),
            Value::UInt8(Some(v)) => drop(write!(out, "{v}")),
            Value::UInt16(Some(v)) => drop(write!(out, "{v}")),
            Value::UInt32(Some(v)) => drop(write!(out, "{v}")),
            Value::UInt64(Some(v)) => drop(write!(out, "{v}")),
            Value::Float32(Some(v)) => self.write_value_float(out, *v as f64),
            Value::Float64(Some(v)) => self.write_value_float(out, *v),
            Value::Decimal(Some(v)) => drop(write!(out, "{v}")),
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v),
            Value::Date(Some(v)) => {
                out.push('\'');
                write_date(out, v);
                out.push('\'');
            }
            Value::Time(Some(v)) => {
                out.push('\'');
                write_time(out, v);
                out.push('\'');
            }
            Value::Timestamp(Some(v)) => {
                out.push('\'');
                write_date(out, &v.date());
                out.push(' ');
                write_time(out, &v.time());
                out.push('\'');
            }
            Value::Uuid(Some(v)) => drop(write!(out, "'{v}'")),
            Value::List(Some(v), ..) => separated_by(
                out,
                v,
                |out, v| {
                    self.write_value(out, v);
                },
                ", ",
            ),
            _ => self.write_value_none(out),
        };
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL")
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize])
    }

    fn write_value_float(&self, out: &mut String, value: f64) {
        if value.is_nan() {
            self.write_value_none(out);
        } else if value.is_infinite() {
            self.write_value_infinity(out, value.is_sign_negative());
        } else {
            let _ = write!(out, "{value:?}");
        }
    }

    fn write_value_infinity(&self, out: &mut String, negative: bool) {
        out.push_str("CAST('");
        if negative {
            out.push('-');
        }
        out.push_str("Infinity' AS DOUBLE)");
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push('\'');
        for b in value {
            let _ = write!(out, "\\x{:02X}", b);
        }
        out.push('\'');
    }

    /// Value written for a column that one row of a multi-row insert lacks.
    fn write_value_missing(&self, out: &mut String) {
        out.push_str("DEFAULT")
    }

    /// Renders `template` replacing every `?` outside string literals with
    /// the next value. Lists render comma separated, meant for `IN (?)`.
    fn write_expr(&self, out: &mut String, template: &str, values: &[Value]) -> Result<()> {
        let mut values = values.iter();
        let mut quoted = false;
        let mut position = 0;
        let mut used = 0;
        for (i, c) in template.char_indices() {
            match c {
                '\'' => quoted = !quoted,
                '?' if !quoted => {
                    let Some(value) = values.next() else {
                        return Err(Error::msg(format!(
                            "Not enough values for the placeholders of `{}`: got {}",
                            truncate_long!(template),
                            used,
                        )));
                    };
                    out.push_str(&template[position..i]);
                    self.write_value(out, value);
                    position = i + 1;
                    used += 1;
                }
                _ => {}
            }
        }
        out.push_str(&template[position..]);
        let remaining = values.count();
        if remaining > 0 {
            return Err(Error::msg(format!(
                "Expression `{}` has {} placeholders but {} values were provided",
                truncate_long!(template),
                used,
                used + remaining,
            )));
        }
        Ok(())
    }

    /// `INSERT INTO` with the union of the columns of `rows`.
    fn write_insert(&self, out: &mut String, table: &str, rows: &[FieldMap]) {
        let columns = rows
            .iter()
            .flat_map(|v| v.keys().map(String::as_str))
            .collect::<BTreeSet<_>>();
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            &columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(") VALUES\n");
        separated_by(
            out,
            rows,
            |out, row| {
                out.push('(');
                separated_by(
                    out,
                    &columns,
                    |out, column| match row.get(*column) {
                        Some(value) => self.write_value(out, value),
                        None => self.write_value_missing(out),
                    },
                    ", ",
                );
                out.push(')');
            },
            ",\n",
        );
    }

    /// Insert that updates the existing row when `keys` collide.
    ///
    /// With no keys the conflict target is omitted and every column is
    /// updated.
    fn write_upsert(&self, out: &mut String, table: &str, rows: &[FieldMap], keys: &[&str]) {
        self.write_insert(out, table, rows);
        if rows.iter().all(|v| v.is_empty()) {
            return;
        }
        let columns = rows
            .iter()
            .flat_map(|v| v.keys().map(String::as_str))
            .filter(|v| !keys.contains(v))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        self.write_insert_update_fragment(out, &columns, keys);
    }

    fn write_insert_update_fragment(&self, out: &mut String, columns: &[&str], keys: &[&str]) {
        out.push_str("\nON CONFLICT");
        if !keys.is_empty() {
            out.push_str(" (");
            separated_by(
                out,
                keys,
                |out, v| self.write_identifier_quoted(out, v),
                ", ",
            );
            out.push(')');
        }
        if columns.is_empty() {
            out.push_str(" DO NOTHING");
            return;
        }
        out.push_str(" DO UPDATE SET\n");
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(out, v);
                out.push_str(" = excluded.");
                self.write_identifier_quoted(out, v);
            },
            ",\n",
        );
    }

    fn write_update(&self, out: &mut String, table: &str, values: &FieldMap, condition: &str) {
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" SET ");
        separated_by(
            out,
            values,
            |out, (k, v)| {
                self.write_identifier_quoted(out, k);
                out.push_str(" = ");
                self.write_value(out, v);
            },
            ", ",
        );
        if !condition.is_empty() {
            out.push_str("\nWHERE ");
            out.push_str(condition);
        }
    }

    fn write_delete(&self, out: &mut String, table: &str, condition: &str) {
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, table);
        if !condition.is_empty() {
            out.push_str("\nWHERE ");
            out.push_str(condition);
        }
    }

    /// Zero means the clause is omitted.
    fn write_limit_offset(&self, out: &mut String, limit: u64, offset: u64) {
        if limit > 0 {
            let _ = write!(out, "\nLIMIT {limit}");
        }
        if offset > 0 {
            let _ = write!(out, "\nOFFSET {offset}");
        }
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK");
    }

    fn write_savepoint(&self, out: &mut String, name: &str) {
        out.push_str("SAVEPOINT ");
        out.push_str(name);
    }

    fn write_savepoint_release(&self, out: &mut String, name: &str) {
        out.push_str("RELEASE SAVEPOINT ");
        out.push_str(name);
    }

    fn write_savepoint_rollback(&self, out: &mut String, name: &str) {
        out.push_str("ROLLBACK TO SAVEPOINT ");
        out.push_str(name);
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;
impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}
impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
