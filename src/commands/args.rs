//! Positional argument extraction for compiled commands
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Values are extracted in declaration order. Optional options missing from
//! the event are `ArgValue::Absent`, so a handler always sees one value per
//! declared option.

use serde_json::Value;
use serenity::model::id::{AttachmentId, ChannelId, RoleId, UserId};

use crate::core::error::DispatchError;
use crate::interactions::event::{OptionData, OptionKind};

/// One extracted option value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Absent,
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
    Mentionable(u64),
    Attachment(AttachmentId),
}

impl ArgValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, ArgValue::Absent)
    }

    /// Parse a raw option value according to its declared kind
    pub(crate) fn parse(kind: OptionKind, value: &Value) -> Option<Self> {
        Some(match kind {
            OptionKind::String => ArgValue::String(value.as_str()?.to_string()),
            OptionKind::Integer => ArgValue::Integer(value.as_i64()?),
            OptionKind::Number => ArgValue::Number(value.as_f64()?),
            OptionKind::Boolean => ArgValue::Boolean(value.as_bool()?),
            OptionKind::User => ArgValue::User(UserId(snowflake(value)?)),
            OptionKind::Channel => ArgValue::Channel(ChannelId(snowflake(value)?)),
            OptionKind::Role => ArgValue::Role(RoleId(snowflake(value)?)),
            OptionKind::Mentionable => ArgValue::Mentionable(snowflake(value)?),
            OptionKind::Attachment => ArgValue::Attachment(AttachmentId(snowflake(value)?)),
            OptionKind::SubCommand | OptionKind::SubCommandGroup => return None,
        })
    }
}

/// Discord sends snowflakes as strings; accept plain numbers too
fn snowflake(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        other => other.as_u64(),
    }
}

/// The argument spec recorded for each declared option, in call order
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArgSpec {
    pub name: String,
    pub kind: OptionKind,
    pub required: bool,
}

/// Extracted arguments, one per declared option
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    /// Extract values from the event's options following the declared order
    pub(crate) fn extract(specs: &[ArgSpec], options: &[OptionData]) -> Result<Self, DispatchError> {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let provided = options
                .iter()
                .find(|opt| opt.name == spec.name)
                .and_then(|opt| opt.value.as_ref().map(|value| (opt.kind, value)));

            let value = match provided {
                None if spec.required => {
                    return Err(invalid(&spec.name, "required option missing from event"))
                }
                None => ArgValue::Absent,
                Some((kind, _)) if kind != spec.kind => {
                    return Err(invalid(
                        &spec.name,
                        &format!("declared as {:?} but received {:?}", spec.kind, kind),
                    ))
                }
                Some((kind, value)) => ArgValue::parse(kind, value)
                    .ok_or_else(|| invalid(&spec.name, &format!("unreadable value {value}")))?,
            };
            values.push((spec.name.clone(), value));
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a declared position (`Absent` past the end)
    pub fn get(&self, index: usize) -> &ArgValue {
        self.values
            .get(index)
            .map(|(_, value)| value)
            .unwrap_or(&ArgValue::Absent)
    }

    pub fn string(&self, index: usize) -> Result<String, DispatchError> {
        self.required(index, "string", Self::opt_string)
    }

    pub fn opt_string(&self, index: usize) -> Option<String> {
        match self.get(index) {
            ArgValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, DispatchError> {
        self.required(index, "integer", Self::opt_integer)
    }

    pub fn opt_integer(&self, index: usize) -> Option<i64> {
        match self.get(index) {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn number(&self, index: usize) -> Result<f64, DispatchError> {
        self.required(index, "number", Self::opt_number)
    }

    pub fn opt_number(&self, index: usize) -> Option<f64> {
        match self.get(index) {
            ArgValue::Number(n) => Some(*n),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, index: usize) -> Result<bool, DispatchError> {
        self.required(index, "boolean", Self::opt_boolean)
    }

    pub fn opt_boolean(&self, index: usize) -> Option<bool> {
        match self.get(index) {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn user(&self, index: usize) -> Result<UserId, DispatchError> {
        self.required(index, "user", Self::opt_user)
    }

    pub fn opt_user(&self, index: usize) -> Option<UserId> {
        match self.get(index) {
            ArgValue::User(id) => Some(*id),
            _ => None,
        }
    }

    pub fn channel(&self, index: usize) -> Result<ChannelId, DispatchError> {
        self.required(index, "channel", Self::opt_channel)
    }

    pub fn opt_channel(&self, index: usize) -> Option<ChannelId> {
        match self.get(index) {
            ArgValue::Channel(id) => Some(*id),
            _ => None,
        }
    }

    pub fn opt_role(&self, index: usize) -> Option<RoleId> {
        match self.get(index) {
            ArgValue::Role(id) => Some(*id),
            _ => None,
        }
    }

    fn required<T>(
        &self,
        index: usize,
        expected: &str,
        read: fn(&Self, usize) -> Option<T>,
    ) -> Result<T, DispatchError> {
        read(self, index).ok_or_else(|| {
            let name = self
                .values
                .get(index)
                .map(|(name, _)| name.as_str())
                .unwrap_or("<out of range>");
            invalid(name, &format!("expected a {expected} at position {index}"))
        })
    }
}

fn invalid(option: &str, reason: &str) -> DispatchError {
    DispatchError::InvalidOptionValue {
        option: option.to_string(),
        reason: reason.to_string(),
    }
}

/// Conversion from positional arguments into a command's own argument type
///
/// ```ignore
/// struct LinkArgs { email: String }
///
/// impl FromArgs for LinkArgs {
///     fn from_args(args: Args) -> Result<Self, DispatchError> {
///         Ok(Self { email: args.string(0)? })
///     }
/// }
/// ```
pub trait FromArgs: Sized + Send + 'static {
    fn from_args(args: Args) -> Result<Self, DispatchError>;
}

impl FromArgs for Args {
    fn from_args(args: Args) -> Result<Self, DispatchError> {
        Ok(args)
    }
}

impl FromArgs for () {
    fn from_args(_args: Args) -> Result<Self, DispatchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, kind: OptionKind, required: bool) -> ArgSpec {
        ArgSpec {
            name: name.to_string(),
            kind,
            required,
        }
    }

    #[test]
    fn test_extract_follows_declaration_order() {
        let specs = [
            spec("email", OptionKind::String, true),
            spec("count", OptionKind::Integer, true),
        ];
        // Event order differs from declaration order
        let options = vec![
            OptionData::value("count", OptionKind::Integer, json!(3)),
            OptionData::value("email", OptionKind::String, json!("a@b.c")),
        ];

        let args = Args::extract(&specs, &options).unwrap();
        assert_eq!(args.string(0).unwrap(), "a@b.c");
        assert_eq!(args.integer(1).unwrap(), 3);
    }

    #[test]
    fn test_optional_absent_keeps_arity() {
        let specs = [
            spec("target", OptionKind::User, false),
            spec("reason", OptionKind::String, false),
            spec("silent", OptionKind::Boolean, false),
        ];
        let options = vec![OptionData::value("silent", OptionKind::Boolean, json!(true))];

        let args = Args::extract(&specs, &options).unwrap();
        assert_eq!(args.len(), 3);
        assert!(args.get(0).is_absent());
        assert!(args.get(1).is_absent());
        assert_eq!(args.opt_boolean(2), Some(true));
    }

    #[test]
    fn test_missing_required_is_error() {
        let specs = [spec("email", OptionKind::String, true)];
        let err = Args::extract(&specs, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidOptionValue { option, .. } if option == "email"));
    }

    #[test]
    fn test_kind_mismatch_is_error() {
        let specs = [spec("count", OptionKind::Integer, true)];
        let options = vec![OptionData::value("count", OptionKind::String, json!("3"))];
        assert!(Args::extract(&specs, &options).is_err());
    }

    #[test]
    fn test_snowflakes_parse_from_strings() {
        let specs = [
            spec("user", OptionKind::User, true),
            spec("channel", OptionKind::Channel, true),
        ];
        let options = vec![
            OptionData::value("user", OptionKind::User, json!("123456789012345678")),
            OptionData::value("channel", OptionKind::Channel, json!(42)),
        ];

        let args = Args::extract(&specs, &options).unwrap();
        assert_eq!(args.user(0).unwrap(), UserId(123456789012345678));
        assert_eq!(args.channel(1).unwrap(), ChannelId(42));
    }

    #[test]
    fn test_typed_getter_on_wrong_type() {
        let specs = [spec("name", OptionKind::String, true)];
        let options = vec![OptionData::value("name", OptionKind::String, json!("x"))];
        let args = Args::extract(&specs, &options).unwrap();

        assert!(args.integer(0).is_err());
        assert!(args.string(5).is_err());
        assert!(args.get(5).is_absent());
    }
}
