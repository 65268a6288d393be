//! Statistics-domain predicates and their evaluation against block
//! statistics.

use std::cmp::Ordering;
use std::fmt;

use crate::path::ColumnPath;
use crate::stats::{BlockStatistics, ColumnOrder, ColumnStatistics, StatValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
        };
        f.write_str(s)
    }
}

/// Result of evaluating a predicate over every row of a block.
///
/// `AlwaysFalse` is the only outcome that allows skipping the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    AlwaysTrue,
    MaybeTrue,
    AlwaysFalse,
}

impl Truth {
    pub fn and(self, rhs: Truth) -> Truth {
        use Truth::*;
        match (self, rhs) {
            (AlwaysFalse, _) | (_, AlwaysFalse) => AlwaysFalse,
            (AlwaysTrue, x) | (x, AlwaysTrue) => x,
            _ => MaybeTrue,
        }
    }

    pub fn or(self, rhs: Truth) -> Truth {
        use Truth::*;
        match (self, rhs) {
            (AlwaysTrue, _) | (_, AlwaysTrue) => AlwaysTrue,
            (AlwaysFalse, x) | (x, AlwaysFalse) => x,
            _ => MaybeTrue,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Truth {
        use Truth::*;
        match self {
            AlwaysTrue => AlwaysFalse,
            AlwaysFalse => AlwaysTrue,
            MaybeTrue => MaybeTrue,
        }
    }
}

/// Predicate over leaf columns in the statistics domain.
///
/// Row semantics are two-valued: comparisons are false on null except
/// `NotEq`, which is true on null.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    Compare {
        column: ColumnPath,
        op: CmpOp,
        value: StatValue,
        order: ColumnOrder,
    },
    In {
        column: ColumnPath,
        values: Vec<StatValue>,
        order: ColumnOrder,
    },
    IsNull {
        column: ColumnPath,
    },
    IsNotNull {
        column: ColumnPath,
    },
    And(Box<FilterPredicate>, Box<FilterPredicate>),
    Or(Box<FilterPredicate>, Box<FilterPredicate>),
    Not(Box<FilterPredicate>),
}

impl FilterPredicate {
    pub fn evaluate(&self, stats: &BlockStatistics) -> Truth {
        match self {
            FilterPredicate::Compare {
                column,
                op,
                value,
                order,
            } => match stats.column(column) {
                Some(col) => eval_compare(*op, value, *order, col, stats.row_count),
                None => Truth::MaybeTrue,
            },
            FilterPredicate::In {
                column,
                values,
                order,
            } => match stats.column(column) {
                Some(col) => values.iter().fold(Truth::AlwaysFalse, |acc, value| {
                    acc.or(eval_compare(CmpOp::Eq, value, *order, col, stats.row_count))
                }),
                None => Truth::MaybeTrue,
            },
            FilterPredicate::IsNull { column } => match stats.column(column) {
                Some(col) if col.is_all_null(stats.row_count) => Truth::AlwaysTrue,
                Some(col) if col.has_no_nulls() => Truth::AlwaysFalse,
                _ => Truth::MaybeTrue,
            },
            FilterPredicate::IsNotNull { column } => match stats.column(column) {
                Some(col) if col.is_all_null(stats.row_count) => Truth::AlwaysFalse,
                Some(col) if col.has_no_nulls() => Truth::AlwaysTrue,
                _ => Truth::MaybeTrue,
            },
            FilterPredicate::And(a, b) => a.evaluate(stats).and(b.evaluate(stats)),
            FilterPredicate::Or(a, b) => a.evaluate(stats).or(b.evaluate(stats)),
            FilterPredicate::Not(x) => x.evaluate(stats).not(),
        }
    }

    /// True only when no row of the block can match.
    pub fn can_skip(&self, stats: &BlockStatistics) -> bool {
        self.evaluate(stats) == Truth::AlwaysFalse
    }

    /// Every column the predicate reads.
    pub fn columns(&self) -> Vec<&ColumnPath> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnPath>) {
        match self {
            FilterPredicate::Compare { column, .. }
            | FilterPredicate::In { column, .. }
            | FilterPredicate::IsNull { column }
            | FilterPredicate::IsNotNull { column } => {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
            FilterPredicate::And(a, b) | FilterPredicate::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            FilterPredicate::Not(x) => x.collect_columns(out),
        }
    }
}

/// Interval reasoning over `[min, max]`, then null handling: a possible null
/// row turns "always true" into "maybe" for every operator but `NotEq`, and
/// "always false" into "maybe" for `NotEq`.
fn eval_compare(
    op: CmpOp,
    literal: &StatValue,
    order: ColumnOrder,
    col: &ColumnStatistics,
    row_count: u64,
) -> Truth {
    use Truth::*;
    if col.is_all_null(row_count) {
        return if op == CmpOp::NotEq { AlwaysTrue } else { AlwaysFalse };
    }
    let (Some(min), Some(max)) = (&col.min, &col.max) else {
        return MaybeTrue;
    };
    let (Some(lo), Some(hi)) = (order.compare(min, literal), order.compare(max, literal)) else {
        return MaybeTrue;
    };
    let single = lo == Ordering::Equal && hi == Ordering::Equal;
    let outside = lo == Ordering::Greater || hi == Ordering::Less;
    let truth = match op {
        CmpOp::Lt => {
            if hi == Ordering::Less {
                AlwaysTrue
            } else if lo != Ordering::Less {
                AlwaysFalse
            } else {
                MaybeTrue
            }
        }
        CmpOp::LtEq => {
            if hi != Ordering::Greater {
                AlwaysTrue
            } else if lo == Ordering::Greater {
                AlwaysFalse
            } else {
                MaybeTrue
            }
        }
        CmpOp::Gt => {
            if lo == Ordering::Greater {
                AlwaysTrue
            } else if hi != Ordering::Greater {
                AlwaysFalse
            } else {
                MaybeTrue
            }
        }
        CmpOp::GtEq => {
            if lo != Ordering::Less {
                AlwaysTrue
            } else if hi == Ordering::Less {
                AlwaysFalse
            } else {
                MaybeTrue
            }
        }
        CmpOp::Eq => {
            if outside {
                AlwaysFalse
            } else if single {
                AlwaysTrue
            } else {
                MaybeTrue
            }
        }
        CmpOp::NotEq => {
            if single {
                AlwaysFalse
            } else if outside {
                AlwaysTrue
            } else {
                MaybeTrue
            }
        }
    };
    let nulls_possible = !col.has_no_nulls();
    match (op, truth) {
        (CmpOp::NotEq, AlwaysFalse) if nulls_possible => MaybeTrue,
        (CmpOp::NotEq, _) => truth,
        (_, AlwaysTrue) if nulls_possible => MaybeTrue,
        _ => truth,
    }
}
