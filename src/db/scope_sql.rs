//! Compiles bound scope predicates into SQLite `WHERE` fragments.

use crate::authz::{is_identifier, Operand, PredicateExpr};
use crate::errors::AppError;

/// A parameterised SQL condition plus its positional bind values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    pub sql: String,
    pub binds: Vec<String>,
}

impl SqlFilter {
    pub fn match_all() -> Self {
        Self {
            sql: "1 = 1".to_string(),
            binds: Vec::new(),
        }
    }
}

/// Compiles `predicate` against rows of the table aliased as `alias`.
///
/// The predicate must already have its `self` placeholder bound; an unbound
/// placeholder is an internal error rather than a silently widened query.
pub fn compile(predicate: &PredicateExpr, alias: &str) -> Result<SqlFilter, AppError> {
    let mut compiler = Compiler::default();
    let sql = compiler.emit(predicate, alias)?;
    Ok(SqlFilter {
        sql,
        binds: compiler.binds,
    })
}

#[derive(Default)]
struct Compiler {
    binds: Vec<String>,
    depth: usize,
}

impl Compiler {
    fn emit(&mut self, predicate: &PredicateExpr, alias: &str) -> Result<String, AppError> {
        match predicate {
            PredicateExpr::MatchAll => Ok("1 = 1".to_string()),
            PredicateExpr::MatchNone => Ok("1 = 0".to_string()),
            PredicateExpr::IsNull { column } => Ok(format!("{alias}.{} IS NULL", ident(column)?)),
            PredicateExpr::Eq { column, value } => match value {
                Operand::Literal(value) => {
                    self.binds.push(value.clone());
                    Ok(format!("{alias}.{} = ?", ident(column)?))
                }
                Operand::SelfId => Err(AppError::internal(format!(
                    "scope predicate on {column:?} still has an unbound self placeholder"
                ))),
            },
            PredicateExpr::Exists {
                table,
                local,
                remote,
                filter,
            } => {
                self.depth += 1;
                let inner = format!("s{}", self.depth);
                let table = ident(table)?;
                let remote = ident(remote)?;
                let local = ident(local)?;
                let filter = self.emit(filter, &inner)?;
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {table} AS {inner} WHERE {inner}.{remote} = {alias}.{local} AND {filter})"
                ))
            }
            PredicateExpr::Any { of } if of.is_empty() => Ok("1 = 0".to_string()),
            PredicateExpr::Every { of } if of.is_empty() => Ok("1 = 1".to_string()),
            PredicateExpr::Any { of } => self.join(of, alias, " OR "),
            PredicateExpr::Every { of } => self.join(of, alias, " AND "),
        }
    }

    fn join(&mut self, parts: &[PredicateExpr], alias: &str, separator: &str) -> Result<String, AppError> {
        let parts = parts
            .iter()
            .map(|part| self.emit(part, alias))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", parts.join(separator)))
    }
}

fn ident(name: &str) -> Result<&str, AppError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(AppError::internal(format!("refusing to compile identifier {name:?}")))
    }
}
