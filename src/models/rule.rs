//! Rule definitions as written by users, and their validated form.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::indicators::{IndicatorId, PREVIOUS_SUFFIX};

fn default_logic() -> String {
    "AND".to_string()
}

fn default_cooldown_seconds() -> i64 {
    60
}

/// Direction of an emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    #[default]
    #[serde(alias = "buy")]
    Buy,
    #[serde(alias = "sell")]
    Sell,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => f.write_str("BUY"),
            SignalKind::Sell => f.write_str("SELL"),
        }
    }
}

/// One side of a condition as it appears in JSON: a number or a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandValue {
    Number(f64),
    Name(String),
}

impl From<f64> for OperandValue {
    fn from(value: f64) -> Self {
        OperandValue::Number(value)
    }
}

impl From<&str> for OperandValue {
    fn from(value: &str) -> Self {
        OperandValue::Name(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub left: OperandValue,
    #[serde(alias = "operator")]
    pub op: String,
    pub right: OperandValue,
}

impl ConditionDefinition {
    pub fn new(left: impl Into<OperandValue>, op: &str, right: impl Into<OperandValue>) -> Self {
        Self {
            left: left.into(),
            op: op.to_string(),
            right: right.into(),
        }
    }
}

/// Unvalidated rule, as loaded from a file or request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_logic")]
    pub logic: String,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    #[serde(default = "default_cooldown_seconds", alias = "cooldown_sec")]
    pub cooldown_seconds: i64,
    #[serde(default, alias = "signal_type")]
    pub signal_kind: SignalKind,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>, cooldown_seconds: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            logic: default_logic(),
            conditions: Vec::new(),
            cooldown_seconds,
            signal_kind: SignalKind::Buy,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_condition(
        mut self,
        left: impl Into<OperandValue>,
        op: &str,
        right: impl Into<OperandValue>,
    ) -> Self {
        self.conditions.push(ConditionDefinition::new(left, op, right));
        self
    }

    pub fn with_signal_kind(mut self, kind: SignalKind) -> Self {
        self.signal_kind = kind;
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(text).map_err(|e| ValidationError::InvalidJson(e.to_string()))
    }

    /// The scalping rule shipped as the default: a fast EMA cross confirmed
    /// by trend, momentum, ADX strength and a volume spike.
    pub fn default_scalping() -> Self {
        RuleDefinition::new("Default Scalping", 60)
            .with_id("default-scalping")
            .with_condition("EMA6", "CROSS_UP", "EMA10")
            .with_condition("PRICE", ">=", "EMA20")
            .with_condition("PRICE_EMA20_DIFF_PCT", "<=", 0.002)
            .with_condition("RSI14", ">", "RSI14_PREV")
            .with_condition("RSI14", ">", 38.0)
            .with_condition("RSI14", "<", 55.0)
            .with_condition("ADX5", ">=", 15.0)
            .with_condition("ADX5", ">", "ADX5_PREV")
            .with_condition("REL_VOLUME_20", ">=", 1.3)
            .with_condition("MACD_HIST", ">=", "MACD_HIST_PREV")
    }
}

/// A resolved operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    Indicator(IndicatorId),
    /// Value of the indicator in the previous snapshot.
    Previous(IndicatorId),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Indicator(id) => write!(f, "{}", id),
            Operand::Previous(id) => write!(f, "{}{}", id, PREVIOUS_SUFFIX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    CrossUp,
    CrossDown,
}

impl Operator {
    pub fn is_crossover(self) -> bool {
        matches!(self, Operator::CrossUp | Operator::CrossDown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::CrossUp => "CROSS_UP",
            Operator::CrossDown => "CROSS_DOWN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "CROSS_UP" => Ok(Operator::CrossUp),
            "CROSS_DOWN" => Ok(Operator::CrossDown),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub left: Operand,
    pub operator: Operator,
    pub right: Operand,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

/// A validated rule. Built only by [`crate::rules::RuleEvaluator::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) cooldown: Duration,
    pub(crate) signal_kind: SignalKind,
}

impl Rule {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn signal_kind(&self) -> SignalKind {
        self.signal_kind
    }

    /// Indicators referenced by any condition, current or previous.
    pub fn referenced_indicators(&self) -> Vec<IndicatorId> {
        let mut ids: Vec<IndicatorId> = self
            .conditions
            .iter()
            .flat_map(|c| [c.left, c.right])
            .filter_map(|operand| match operand {
                Operand::Indicator(id) | Operand::Previous(id) => Some(id),
                Operand::Literal(_) => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
