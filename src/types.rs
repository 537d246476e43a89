//! SQL type system: type descriptors, runtime values, conversion and
//! ordering.

pub mod collation;
pub mod compare;
pub mod convert;
pub mod datetime;
pub mod decimal;
pub mod error;
pub mod sql_type;
pub mod value;

pub use collation::{CharacterSet, Collation};
pub use compare::RowNulls;
pub use convert::ConvertInRange;
pub use datetime::Timespan;
pub use decimal::{Decimal, DecimalType};
pub use error::{TypeError, TypeResult};
pub use sql_type::{EnumType, SetType, SqlType, StringKind, StringType};
pub use value::{Row, Value};
