//! vibexpr - evaluate a JSON-encoded SQL expression against one row

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Parser as ClapParser;
use regex::Regex;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use vibexpr::config::EvalConfig;
use vibexpr::expression::{
    ArithmeticOperator, BitOperator, Convert, Expression, ExpressionEvaluator, ExpressionOps,
    HashInTuple, Interval, IsTrue, Like, TypeChecker,
};
use vibexpr::session::{Context, Session};
use vibexpr::types::{SqlType, Value};

/// Evaluate a SQL expression with MySQL semantics
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Expression document (JSON), or `-` for stdin
    #[arg(short, long)]
    expr: String,

    /// Input row as a JSON array
    #[arg(short, long, default_value = "[]")]
    row: String,

    /// Evaluation config file
    #[arg(short, long, default_value = "vibexpr.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// One node of an expression document.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ExprDoc {
    Literal {
        value: serde_json::Value,
        #[serde(default, rename = "type")]
        sql_type: Option<String>,
    },
    Column {
        index: usize,
        #[serde(rename = "type")]
        sql_type: String,
        #[serde(default)]
        name: Option<String>,
    },
    Tuple {
        elements: Vec<ExprDoc>,
    },
    Binary {
        op: String,
        left: Box<ExprDoc>,
        right: Box<ExprDoc>,
    },
    Neg {
        child: Box<ExprDoc>,
    },
    Not {
        child: Box<ExprDoc>,
    },
    IsNull {
        child: Box<ExprDoc>,
        #[serde(default)]
        negated: bool,
    },
    IsTrue {
        child: Box<ExprDoc>,
        #[serde(default = "default_true")]
        value: bool,
        #[serde(default)]
        negated: bool,
    },
    Between {
        value: Box<ExprDoc>,
        lower: Box<ExprDoc>,
        upper: Box<ExprDoc>,
    },
    In {
        left: Box<ExprDoc>,
        right: Vec<ExprDoc>,
        #[serde(default)]
        hashed: bool,
    },
    Like {
        left: Box<ExprDoc>,
        pattern: Box<ExprDoc>,
        #[serde(default)]
        escape: Option<char>,
    },
    Collate {
        child: Box<ExprDoc>,
        collation: String,
    },
    Convert {
        child: Box<ExprDoc>,
        target: String,
        #[serde(default)]
        length: Option<u32>,
        #[serde(default)]
        scale: Option<u32>,
    },
    Interval {
        child: Box<ExprDoc>,
        unit: String,
    },
}

fn default_true() -> bool {
    true
}

impl ExprDoc {
    fn build(self) -> Result<Expression> {
        let expr = match self {
            ExprDoc::Literal { value, sql_type } => {
                let value = json_to_value(value);
                match sql_type {
                    Some(name) => {
                        let typ = parse_type_name(&name)?;
                        let (converted, _) = typ
                            .convert(&value)
                            .with_context(|| format!("literal {} is not a valid {}", value, typ))?;
                        Expression::typed_literal(converted, typ)
                    }
                    None => Expression::literal(value),
                }
            }
            ExprDoc::Column {
                index,
                sql_type,
                name,
            } => {
                let name = name.unwrap_or_else(|| format!("col{}", index));
                Expression::column(index, parse_type_name(&sql_type)?, name)
            }
            ExprDoc::Tuple { elements } => Expression::tuple(build_all(elements)?),
            ExprDoc::Binary { op, left, right } => {
                build_binary(&op, left.build()?, right.build()?)?
            }
            ExprDoc::Neg { child } => Expression::unary_minus(child.build()?),
            ExprDoc::Not { child } => Expression::not_expr(child.build()?),
            ExprDoc::IsNull { child, negated } => {
                if negated {
                    Expression::is_not_null(child.build()?)
                } else {
                    Expression::is_null(child.build()?)
                }
            }
            ExprDoc::IsTrue {
                child,
                value,
                negated,
            } => {
                let node = IsTrue::new(child.build()?, value);
                Expression::IsTrue(if negated { node.negate() } else { node })
            }
            ExprDoc::Between {
                value,
                lower,
                upper,
            } => Expression::between(value.build()?, lower.build()?, upper.build()?),
            ExprDoc::In {
                left,
                right,
                hashed,
            } => {
                let left = left.build()?;
                let right = Expression::tuple(build_all(right)?);
                if hashed {
                    Expression::HashInTuple(HashInTuple::new(left, right)?)
                } else {
                    Expression::in_tuple(left, right)
                }
            }
            ExprDoc::Like {
                left,
                pattern,
                escape,
            } => match escape {
                Some(c) => Expression::Like(Like::with_escape(left.build()?, pattern.build()?, c)),
                None => Expression::like(left.build()?, pattern.build()?),
            },
            ExprDoc::Collate { child, collation } => {
                Expression::collate(child.build()?, &collation)?
            }
            ExprDoc::Convert {
                child,
                target,
                length,
                scale,
            } => Expression::Convert(Convert::with_length_and_scale(
                child.build()?,
                &target,
                length,
                scale,
            )?),
            ExprDoc::Interval { child, unit } => {
                Expression::Interval(Interval::new(child.build()?, &unit)?)
            }
        };
        Ok(expr)
    }
}

fn build_all(docs: Vec<ExprDoc>) -> Result<Vec<Expression>> {
    docs.into_iter().map(ExprDoc::build).collect()
}

fn build_binary(op: &str, left: Expression, right: Expression) -> Result<Expression> {
    let expr = match op.to_ascii_lowercase().as_str() {
        "+" => Expression::arithmetic(ArithmeticOperator::Plus, left, right),
        "-" => Expression::arithmetic(ArithmeticOperator::Minus, left, right),
        "*" => Expression::arithmetic(ArithmeticOperator::Mult, left, right),
        "div" => Expression::arithmetic(ArithmeticOperator::IntDiv, left, right),
        "%" | "mod" => Expression::arithmetic(ArithmeticOperator::Mod, left, right),
        "/" => Expression::div_expr(left, right),
        "&" => Expression::bit_op(BitOperator::And, left, right),
        "|" => Expression::bit_op(BitOperator::Or, left, right),
        "^" => Expression::bit_op(BitOperator::Xor, left, right),
        "<<" => Expression::bit_op(BitOperator::ShiftLeft, left, right),
        ">>" => Expression::bit_op(BitOperator::ShiftRight, left, right),
        "=" => Expression::eq(left, right),
        "<=>" => Expression::null_safe_eq(left, right),
        "!=" | "<>" => Expression::ne(left, right),
        "<" => Expression::lt(left, right),
        "<=" => Expression::le(left, right),
        ">" => Expression::gt(left, right),
        ">=" => Expression::ge(left, right),
        "and" => Expression::and(left, right),
        "or" => Expression::or(left, right),
        "xor" => Expression::xor(left, right),
        other => bail!("unknown operator `{}`", other),
    };
    Ok(expr)
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint64(u)
            } else {
                Value::Float64(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => {
            Value::Tuple(items.into_iter().map(json_to_value).collect())
        }
        object => Value::Json(object),
    }
}

/// Parse a MySQL column type name such as `int unsigned` or `decimal(10,2)`.
fn parse_type_name(name: &str) -> Result<SqlType> {
    let re = Regex::new(r"^\s*([a-z]+)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*(unsigned)?\s*$")?;
    let lower = name.to_ascii_lowercase();
    let caps = re
        .captures(&lower)
        .ok_or_else(|| anyhow!("invalid type name `{}`", name))?;
    let arg = |i: usize| -> Result<Option<u32>> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(Into::into)
    };
    let length = arg(2)?;
    let scale = arg(3)?;
    let unsigned = caps.get(4).is_some();

    let typ = match (&caps[1], unsigned) {
        ("null", _) => SqlType::Null,
        ("bool" | "boolean", _) => SqlType::Boolean,
        ("tinyint", false) if length == Some(1) => SqlType::Boolean,
        ("tinyint", false) => SqlType::Int8,
        ("tinyint", true) => SqlType::Uint8,
        ("smallint", false) => SqlType::Int16,
        ("smallint", true) => SqlType::Uint16,
        ("mediumint", false) => SqlType::Int24,
        ("mediumint", true) => SqlType::Uint24,
        ("int" | "integer", false) => SqlType::Int32,
        ("int" | "integer", true) => SqlType::Uint32,
        ("bigint", false) => SqlType::Int64,
        ("bigint", true) => SqlType::Uint64,
        ("float", _) => SqlType::Float32,
        ("double" | "real", _) => SqlType::Float64,
        ("decimal", _) => SqlType::decimal(length.unwrap_or(10), scale.unwrap_or(0)),
        ("year", _) => SqlType::Year,
        ("date", _) => SqlType::Date,
        ("datetime", _) => SqlType::Datetime,
        ("timestamp", _) => SqlType::Timestamp,
        ("time", _) => SqlType::Time,
        ("varchar" | "char", _) => SqlType::varchar(length.unwrap_or(255)),
        ("text" | "longtext", _) => SqlType::long_text(),
        ("varbinary" | "binary", _) => SqlType::varbinary(length.unwrap_or(255)),
        ("blob" | "longblob", _) => SqlType::long_blob(),
        ("json", _) => SqlType::Json,
        _ => bail!("unsupported type name `{}`", name),
    };
    Ok(typ)
}

fn read_expr_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read expression from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read expression file {}", source))
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = EvalConfig::load_from_path(&args.config).context("Failed to load config")?;
    log::debug!("using config {:?}", config);

    let doc: ExprDoc = serde_json::from_str(&read_expr_source(&args.expr)?)
        .context("Failed to parse expression document")?;
    let expr = doc.build()?;

    let row: Vec<serde_json::Value> =
        serde_json::from_str(&args.row).context("Row must be a JSON array")?;
    let row: Vec<Value> = row.into_iter().map(json_to_value).collect();

    let schema: Vec<SqlType> = row.iter().map(Value::sql_type).collect();
    let result_type = TypeChecker::new(&schema).check(&expr)?;
    log::debug!("{} -> {}", expr.debug_string(), result_type);

    let session = Arc::new(Session::new(config));
    let ctx = Context::new(session.clone(), 1);
    let value = ExpressionEvaluator::new(&ctx, &expr).evaluate(&row)?;
    println!("{}", value);

    for warning in session.warnings() {
        println!("{} {}: {}", warning.level, warning.code, warning.message);
    }
    Ok(())
}
