//! A minimal whitespace-token reader for `hpwh-core`'s key/value
//! configuration shape (spec.md §6): "no particular line format is
//! mandated beyond whitespace-separated tokens," so this reader picks one
//! straightforward layout and is not itself exercised by the core's
//! invariants — callers who want a different serialization should
//! deserialize directly into [`hpwh_core::config::SimulationConfig`]
//! (which derives `serde::Deserialize` under the `serde` feature) instead.
//!
//! # Format
//!
//! One directive per line; blank lines and lines starting with `#` are
//! ignored. Tank keys appear first, then one `heatsource` block per
//! source:
//!
//! ```text
//! numNodes 12
//! volumeL 189.0
//! uaKjPerHourC 6.5
//! setpointC 51.7
//! mixOnDraw false
//! doTempDepression false
//!
//! heatsource resistive
//!   powerKw 4.5
//!   startNode 0
//!   isVip false
//!   minAmbientC -50.0
//!   maxAmbientC 100.0
//!   maxSetpointC 60.0
//!   turnOn standby belowSetpoint 19.0 lessOrEqual 1.0
//!   shutOff standby absolute 51.7 greaterOrEqual 1.0
//! endheatsource
//! ```

use thiserror::Error;

use hpwh_core::config::{
    ComparatorConfig, DecisionPointConfig, HeatSourceConfig, HeatSourceKindConfig,
    HeatingLogicConfig, SimulationConfig, TankConfig,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigReadError {
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("missing required tank key {0:?}")]
    MissingTankKey(&'static str),
}

/// Parses the whitespace-token configuration format into a
/// [`SimulationConfig`].
pub fn parse(source: &str) -> Result<SimulationConfig, ConfigReadError> {
    let mut num_nodes = None;
    let mut volume_l = None;
    let mut ua_kj_per_hour_c = None;
    let mut setpoint_c = None;
    let mut mix_on_draw = false;
    let mut do_temp_depression = false;
    let mut heat_sources = Vec::new();

    let mut lines = source.lines().enumerate().peekable();
    while let Some((line_no, raw_line)) = lines.next() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();

        match key {
            "numNodes" => num_nodes = Some(parse_token::<usize>(line_no, &rest, 0)?),
            "volumeL" => volume_l = Some(parse_token::<f64>(line_no, &rest, 0)?),
            "uaKjPerHourC" => ua_kj_per_hour_c = Some(parse_token::<f64>(line_no, &rest, 0)?),
            "setpointC" => setpoint_c = Some(parse_token::<f64>(line_no, &rest, 0)?),
            "mixOnDraw" => mix_on_draw = parse_token::<bool>(line_no, &rest, 0)?,
            "doTempDepression" => do_temp_depression = parse_token::<bool>(line_no, &rest, 0)?,
            "heatsource" => {
                let kind_name = rest.first().copied().ok_or_else(|| ConfigReadError::Malformed {
                    line: line_no + 1,
                    message: "heatsource block requires a kind name".to_string(),
                })?;
                heat_sources.push(parse_heat_source_block(kind_name, &mut lines)?);
            }
            other => {
                return Err(ConfigReadError::Malformed {
                    line: line_no + 1,
                    message: format!("unrecognized key {other:?}"),
                });
            }
        }
    }

    Ok(SimulationConfig {
        tank: TankConfig {
            num_nodes: num_nodes.ok_or(ConfigReadError::MissingTankKey("numNodes"))?,
            volume_l: volume_l.ok_or(ConfigReadError::MissingTankKey("volumeL"))?,
            ua_kj_per_hour_c: ua_kj_per_hour_c.ok_or(ConfigReadError::MissingTankKey("uaKjPerHourC"))?,
            setpoint_c: setpoint_c.ok_or(ConfigReadError::MissingTankKey("setpointC"))?,
            mix_on_draw,
        },
        heat_sources,
        do_temp_depression,
    })
}

fn parse_heat_source_block(
    kind_name: &str,
    lines: &mut std::iter::Peekable<std::iter::Enumerate<std::str::Lines>>,
) -> Result<HeatSourceConfig, ConfigReadError> {
    let mut power_kw = None;
    let mut start_node = None;
    let mut is_vip = false;
    let mut min_ambient_c = -50.0;
    let mut max_ambient_c = 100.0;
    let mut max_setpoint_c = 60.0;
    let mut backup = None;
    let mut companions = Vec::new();
    let mut followed_by = None;
    let mut turn_on_logics = Vec::new();
    let mut shut_off_logics = Vec::new();

    loop {
        let (line_no, raw_line) = lines.next().ok_or_else(|| ConfigReadError::Malformed {
            line: usize::MAX,
            message: "heatsource block missing endheatsource".to_string(),
        })?;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "endheatsource" {
            break;
        }

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();

        match key {
            "powerKw" => power_kw = Some(parse_token::<f64>(line_no, &rest, 0)?),
            "startNode" => start_node = Some(parse_token::<usize>(line_no, &rest, 0)?),
            "isVip" => is_vip = parse_token::<bool>(line_no, &rest, 0)?,
            "minAmbientC" => min_ambient_c = parse_token::<f64>(line_no, &rest, 0)?,
            "maxAmbientC" => max_ambient_c = parse_token::<f64>(line_no, &rest, 0)?,
            "maxSetpointC" => max_setpoint_c = parse_token::<f64>(line_no, &rest, 0)?,
            "backup" => backup = Some(parse_token::<usize>(line_no, &rest, 0)?),
            "followedBy" => followed_by = Some(parse_token::<usize>(line_no, &rest, 0)?),
            "companion" => companions.push(parse_token::<usize>(line_no, &rest, 0)?),
            "turnOn" => turn_on_logics.push(parse_logic(line_no, &rest)?),
            "shutOff" => shut_off_logics.push(parse_logic(line_no, &rest)?),
            other => {
                return Err(ConfigReadError::Malformed {
                    line: line_no + 1,
                    message: format!("unrecognized heat source key {other:?}"),
                });
            }
        }
    }

    let kind = match kind_name {
        "resistive" => HeatSourceKindConfig::Resistive {
            power_kw: power_kw.ok_or_else(|| ConfigReadError::Malformed {
                line: 0,
                message: "resistive heat source requires powerKw".to_string(),
            })?,
            start_node: start_node.ok_or_else(|| ConfigReadError::Malformed {
                line: 0,
                message: "resistive heat source requires startNode".to_string(),
            })?,
        },
        other => {
            return Err(ConfigReadError::Malformed {
                line: 0,
                message: format!(
                    "heat source kind {other:?} is not supported by the whitespace-token reader; \
                     deserialize a HeatSourceKindConfig directly for wrapped-compressor or \
                     external-loop sources"
                ),
            });
        }
    };

    Ok(HeatSourceConfig {
        kind,
        turn_on_logics,
        shut_off_logics,
        min_ambient_c,
        max_ambient_c,
        max_setpoint_c,
        is_vip,
        backup,
        companions,
        followed_by,
    })
}

/// Parses a `turnOn`/`shutOff` line's remaining tokens:
/// `<selector> <absolute|belowSetpoint> <value> <greaterOrEqual|lessOrEqual> <hysteresis>`.
fn parse_logic(line_no: usize, tokens: &[&str]) -> Result<HeatingLogicConfig, ConfigReadError> {
    let [selector, point_kind, point_value, comparator, hysteresis] = tokens else {
        return Err(ConfigReadError::Malformed {
            line: line_no + 1,
            message: "logic line requires exactly 5 tokens: selector, decision-point kind/value, comparator, hysteresis".to_string(),
        });
    };

    let value: f64 = point_value.parse().map_err(|_| ConfigReadError::Malformed {
        line: line_no + 1,
        message: format!("invalid decision point value {point_value:?}"),
    })?;
    let decision_point = match *point_kind {
        "absolute" => DecisionPointConfig::AbsoluteC(value),
        "belowSetpoint" => DecisionPointConfig::BelowSetpointC(value),
        other => {
            return Err(ConfigReadError::Malformed {
                line: line_no + 1,
                message: format!("unknown decision point kind {other:?}"),
            });
        }
    };

    let comparator = match *comparator {
        "greaterOrEqual" => ComparatorConfig::GreaterOrEqual,
        "lessOrEqual" => ComparatorConfig::LessOrEqual,
        other => {
            return Err(ConfigReadError::Malformed {
                line: line_no + 1,
                message: format!("unknown comparator {other:?}"),
            });
        }
    };

    let hysteresis_c: f64 = hysteresis.parse().map_err(|_| ConfigReadError::Malformed {
        line: line_no + 1,
        message: format!("invalid hysteresis value {hysteresis:?}"),
    })?;

    Ok(HeatingLogicConfig::Shorthand {
        selector: (*selector).to_string(),
        decision_point,
        comparator,
        hysteresis_c,
    })
}

fn parse_token<T: std::str::FromStr>(
    line_no: usize,
    tokens: &[&str],
    index: usize,
) -> Result<T, ConfigReadError> {
    tokens
        .get(index)
        .ok_or_else(|| ConfigReadError::Malformed {
            line: line_no + 1,
            message: format!("missing token at position {index}"),
        })?
        .parse()
        .map_err(|_| ConfigReadError::Malformed {
            line: line_no + 1,
            message: format!("could not parse {:?} as the expected type", tokens[index]),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
# a minimal single-element resistance tank
numNodes 12
volumeL 189.0
uaKjPerHourC 6.5
setpointC 51.7
mixOnDraw false
doTempDepression false

heatsource resistive
  powerKw 4.5
  startNode 0
  isVip true
  minAmbientC -50.0
  maxAmbientC 100.0
  maxSetpointC 60.0
  turnOn standby belowSetpoint 19.0 lessOrEqual 1.0
  shutOff standby absolute 51.7 greaterOrEqual 1.0
endheatsource
";

    #[test]
    fn parses_a_complete_single_source_config() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.tank.num_nodes, 12);
        assert_eq!(config.heat_sources.len(), 1);
        assert!(config.heat_sources[0].is_vip);
        assert!(config.build().is_ok());
    }

    #[test]
    fn missing_tank_key_is_reported() {
        let result = parse("numNodes 12\n");
        assert!(matches!(result, Err(ConfigReadError::MissingTankKey("volumeL"))));
    }

    #[test]
    fn unclosed_heat_source_block_is_an_error() {
        let result = parse("numNodes 12\nvolumeL 189.0\nuaKjPerHourC 6.5\nsetpointC 51.7\nheatsource resistive\n");
        assert!(result.is_err());
    }
}
