//! Validates rule definitions and evaluates compiled rules against
//! indicator snapshots.
//!
//! The vocabulary is closed: operands are numbers, indicator names, or
//! indicator names suffixed with `_PREV`. Nothing in a definition is ever
//! executed.

use chrono::Duration;

use crate::error::ValidationError;
use crate::indicators::{IndicatorId, PREVIOUS_SUFFIX};
use crate::models::{
    Condition, IndicatorSnapshot, Operand, OperandValue, Operator, Rule, RuleDefinition,
};

/// Stateless entry point for rule validation, compilation and evaluation.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Checks a definition without building a rule.
    pub fn validate(definition: &RuleDefinition) -> Result<(), ValidationError> {
        Self::compile_conditions(definition).map(|_| ())
    }

    /// Validates `definition` and turns it into an executable [`Rule`].
    pub fn compile(definition: RuleDefinition) -> Result<Rule, ValidationError> {
        let conditions = Self::compile_conditions(&definition)?;
        let cooldown = cooldown_duration(definition.cooldown_seconds)?;
        let id = definition
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slugify(&definition.name));

        Ok(Rule {
            id,
            name: definition.name.trim().to_string(),
            conditions,
            cooldown,
            signal_kind: definition.signal_kind,
        })
    }

    /// True when every condition holds. Missing values fail the condition.
    pub fn evaluate(rule: &Rule, current: &IndicatorSnapshot, previous: &IndicatorSnapshot) -> bool {
        rule.conditions
            .iter()
            .all(|condition| Self::evaluate_condition(condition, current, previous))
    }

    pub fn evaluate_condition(
        condition: &Condition,
        current: &IndicatorSnapshot,
        previous: &IndicatorSnapshot,
    ) -> bool {
        if condition.operator.is_crossover() {
            return Self::evaluate_crossover(condition, current, previous).unwrap_or(false);
        }

        let left = resolve(condition.left, current, previous);
        let right = resolve(condition.right, current, previous);
        match (left, right) {
            (Some(l), Some(r)) => compare_value(l, condition.operator, r),
            _ => false,
        }
    }

    fn evaluate_crossover(
        condition: &Condition,
        current: &IndicatorSnapshot,
        previous: &IndicatorSnapshot,
    ) -> Option<bool> {
        let cur_a = resolve(condition.left, current, previous)?;
        let cur_b = resolve(condition.right, current, previous)?;
        // both sides re-read against the older snapshot
        let prev_a = resolve(condition.left, previous, previous)?;
        let prev_b = resolve(condition.right, previous, previous)?;

        Some(match condition.operator {
            Operator::CrossUp => prev_a <= prev_b && cur_a > cur_b,
            Operator::CrossDown => prev_a >= prev_b && cur_a < cur_b,
            _ => false,
        })
    }

    fn compile_conditions(definition: &RuleDefinition) -> Result<Vec<Condition>, ValidationError> {
        if definition.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !definition.logic.trim().eq_ignore_ascii_case("AND") {
            return Err(ValidationError::UnsupportedLogic(definition.logic.clone()));
        }
        if definition.conditions.is_empty() {
            return Err(ValidationError::EmptyConditions);
        }
        cooldown_duration(definition.cooldown_seconds)?;

        definition
            .conditions
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let operator = raw.op.parse::<Operator>().map_err(|_| {
                    ValidationError::UnknownOperator {
                        index,
                        operator: raw.op.clone(),
                    }
                })?;
                let left = parse_operand(index, &raw.left)?;
                let right = parse_operand(index, &raw.right)?;

                if operator.is_crossover()
                    && [left, right].iter().any(|o| matches!(o, Operand::Previous(_)))
                {
                    return Err(ValidationError::PreviousInCrossover {
                        index,
                        operator: operator.to_string(),
                    });
                }

                Ok(Condition {
                    left,
                    operator,
                    right,
                })
            })
            .collect()
    }
}

fn cooldown_duration(seconds: i64) -> Result<Duration, ValidationError> {
    if seconds <= 0 {
        return Err(ValidationError::NonPositiveCooldown(seconds));
    }
    Duration::try_seconds(seconds).ok_or(ValidationError::CooldownOutOfRange(seconds))
}

fn parse_operand(index: usize, value: &OperandValue) -> Result<Operand, ValidationError> {
    match value {
        OperandValue::Number(n) if n.is_finite() => Ok(Operand::Literal(*n)),
        OperandValue::Number(_) => Err(ValidationError::NonFiniteLiteral { index }),
        OperandValue::Name(name) => {
            let unknown = || ValidationError::UnknownOperand {
                index,
                operand: name.clone(),
            };
            let trimmed = name.trim().to_ascii_uppercase();
            match trimmed.strip_suffix(PREVIOUS_SUFFIX) {
                Some(base) => base
                    .parse::<IndicatorId>()
                    .map(Operand::Previous)
                    .map_err(|_| unknown()),
                None => trimmed
                    .parse::<IndicatorId>()
                    .map(Operand::Indicator)
                    .map_err(|_| unknown()),
            }
        }
    }
}

fn resolve(operand: Operand, current: &IndicatorSnapshot, previous: &IndicatorSnapshot) -> Option<f64> {
    match operand {
        Operand::Literal(v) => Some(v),
        Operand::Indicator(id) => current.get(id),
        Operand::Previous(id) => previous.get(id),
    }
}

fn compare_value(left: f64, operator: Operator, right: f64) -> bool {
    match operator {
        Operator::Gt => left > right,
        Operator::Lt => left < right,
        Operator::Ge => left >= right,
        Operator::Le => left <= right,
        Operator::CrossUp | Operator::CrossDown => false,
    }
}

fn slugify(name: &str) -> String {
    let slug: Vec<String> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect();
    slug.join("-")
}
