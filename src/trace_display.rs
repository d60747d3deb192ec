use std::{
    fmt::{Display, Formatter},
    sync::OnceLock,
};

use prettytable::{format, Cell, Row, Table};

use crate::{
    ad_trace::{Node, TracedOp},
    num::Float,
    Trace,
};

static FORMAT_TRACE: OnceLock<format::TableFormat> = OnceLock::new();

fn get_pretty_format() -> &'static format::TableFormat {
    FORMAT_TRACE.get_or_init(|| {
        format::FormatBuilder::new()
            .column_separator('│')
            .borders('│')
            .separators(
                &[format::LinePosition::Top],
                format::LineSeparator::new('─', '┬', '┌', '┐'),
            )
            .separators(
                &[format::LinePosition::Title],
                format::LineSeparator::new('─', '┼', '├', '┤'),
            )
            .separators(
                &[format::LinePosition::Bottom],
                format::LineSeparator::new('─', '┴', '└', '┘'),
            )
            .padding(1, 1)
            .build()
    })
}

fn describe(op: TracedOp) -> (String, String) {
    match op {
        TracedOp::Constant => ("const".to_string(), String::new()),
        TracedOp::Independent => ("var".to_string(), String::new()),
        TracedOp::Dependent(a) => ("bind".to_string(), format!("{a}")),
        TracedOp::Unary(op, a) => (op.to_string(), format!("{a}")),
        TracedOp::Binary(op, a, b) => (op.to_string(), format!("{a}, {b}")),
        TracedOp::Ternary(op, a, b, c) => (op.to_string(), format!("{a}, {b}, {c}")),
    }
}

fn format_scalar<T: Display>(x: &T, precision: Option<usize>) -> String {
    match precision {
        Some(precision) => format!("{x:.precision$}"),
        None => format!("{x}"),
    }
}

fn node_row<T: Display>(index: usize, node: &Node<T>, precision: Option<usize>) -> Row {
    let (op, operands) = describe(node.op);
    let grad = if node.op.is_bound() {
        format_scalar(&node.grad, precision)
    } else {
        String::new()
    };
    Row::new(vec![
        Cell::new(&index.to_string()),
        Cell::new(&op),
        Cell::new(&operands),
        Cell::new(&format_scalar(&node.value, precision)),
        Cell::new(&grad),
    ])
}

/// One row per node: index, operation, operand indices, value and, for independent
/// and dependent variables, the gradient accumulator.
impl<T: Float + Display> Display for Trace<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut table = Table::new();
        table.set_format(*get_pretty_format());
        table.set_titles(Row::new(
            ["#", "op", "operands", "value", "grad"]
                .iter()
                .map(|title| Cell::new(title))
                .collect(),
        ));
        for (index, node) in self.borrow().iter().enumerate() {
            table.add_row(node_row(index, node, f.precision()));
        }
        write!(f, "{table}")
    }
}
