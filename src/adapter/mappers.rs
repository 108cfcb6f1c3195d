//! Parameter mappers
//!
//! Six operations translate between the values a router speaks (percentages,
//! `"true"`/`"false"`, input names) and what QRC puts on the wire (`Position`
//! floats, `Value` integers, `<output>.select.<input>` control names). Each
//! public operation is one retried unit; the `*_once` functions below are a
//! single attempt.

use serde_json::{Value, json};

use super::Adapter;
use super::codec::Response;
use super::connection::LineConnection;
use super::diagnostics::{Diagnostics, Outcome};
use super::error::{AdapterError, Result};
use super::exchange::Exchanger;
use super::retry::{OK, Success, UNKNOWN};

/// QRC method setting a named control
pub const CONTROL_SET: &str = "Control.Set";
/// QRC method reading named controls
pub const CONTROL_GET: &str = "Control.Get";
/// QRC method setting controls on a component
pub const COMPONENT_SET: &str = "Component.Set";
/// QRC method listing a component's controls
pub const COMPONENT_GET_CONTROLS: &str = "Component.GetControls";

/// Separator between output and input in a router control name
pub const ROUTE_SELECT: &str = ".select.";

const POSITION: &str = "Position";
const VALUE: &str = "Value";

impl<C: LineConnection> Adapter<C> {
    /// Set a gain control to a percentage (`"0"`..`"100"`).
    pub fn set_volume(&mut self, name: &str, percent: &str) -> Outcome {
        self.run("set_volume", Success::Acknowledged, |exchanger, diagnostics| {
            set_volume_once(exchanger, diagnostics, name, percent)
        })
    }

    /// Set a boolean control from `"true"`/`"false"`.
    pub fn set_toggle(&mut self, name: &str, state: &str) -> Outcome {
        self.run("set_toggle", Success::Acknowledged, |exchanger, diagnostics| {
            set_toggle_once(exchanger, diagnostics, name, state)
        })
    }

    /// Route `input` to the output named by `target` (`"<component>_<output>"`).
    pub fn set_video_route(&mut self, target: &str, input: &str) -> Outcome {
        self.run(
            "set_video_route",
            Success::Acknowledged,
            |exchanger, diagnostics| set_video_route_once(exchanger, diagnostics, target, input),
        )
    }

    /// Read a gain control as a percentage.
    pub fn get_volume(&mut self, name: &str) -> Outcome {
        self.run("get_volume", Success::Known, |exchanger, diagnostics| {
            get_volume_once(exchanger, diagnostics, name)
        })
    }

    /// Read a boolean control as `"true"`/`"false"`.
    pub fn get_toggle(&mut self, name: &str) -> Outcome {
        self.run("get_toggle", Success::Known, |exchanger, diagnostics| {
            get_toggle_once(exchanger, diagnostics, name)
        })
    }

    /// Read which input is routed to the output named by `target`.
    pub fn get_video_route(&mut self, target: &str) -> Outcome {
        self.run("get_video_route", Success::Known, |exchanger, diagnostics| {
            get_video_route_once(exchanger, diagnostics, target)
        })
    }
}

fn set_volume_once<C: LineConnection>(
    exchanger: &mut Exchanger<C>,
    diagnostics: &mut Diagnostics,
    name: &str,
    percent: &str,
) -> Result<String> {
    let position = percent_to_position(percent)?;
    let params = json!({"Name": name, "Position": position});
    let response = exchanger.exchange(CONTROL_SET, &params, diagnostics)?;

    tracing::debug!(control = name, position, result = ?response.result, "volume set");
    Ok(OK.to_string())
}

fn set_toggle_once<C: LineConnection>(
    exchanger: &mut Exchanger<C>,
    diagnostics: &mut Diagnostics,
    name: &str,
    state: &str,
) -> Result<String> {
    let value = toggle_to_wire(state)?;
    let params = json!({"Name": name, "Value": value});
    let response = exchanger.exchange(CONTROL_SET, &params, diagnostics)?;

    tracing::debug!(control = name, value, result = ?response.result, "toggle set");
    Ok(OK.to_string())
}

fn set_video_route_once<C: LineConnection>(
    exchanger: &mut Exchanger<C>,
    diagnostics: &mut Diagnostics,
    target: &str,
    input: &str,
) -> Result<String> {
    let route = RouteTarget::parse(target)?;
    let input = strip_quotes(input);
    if input.is_empty() {
        return Err(AdapterError::invalid_input(
            "video input",
            input,
            "input name is empty",
        ));
    }

    let control = route.control_for(input);
    let params = json!({
        "Name": route.component,
        "Controls": [{"Name": control, "Value": 1}],
    });
    let response = exchanger.exchange(COMPONENT_SET, &params, diagnostics)?;

    tracing::debug!(component = route.component, %control, result = ?response.result, "video route set");
    Ok(OK.to_string())
}

fn get_volume_once<C: LineConnection>(
    exchanger: &mut Exchanger<C>,
    diagnostics: &mut Diagnostics,
    name: &str,
) -> Result<String> {
    let response = exchanger.exchange(CONTROL_GET, &json!([name]), diagnostics)?;

    match control_field(&response, name, POSITION)? {
        None => Ok(UNKNOWN.to_string()),
        Some(Value::Number(position)) => match position.as_f64() {
            Some(position) => Ok(position_to_percent(position)),
            None => Err(AdapterError::Semantic(format!(
                "{POSITION} for {name} is not a finite number: {position}"
            ))),
        },
        Some(other) => Err(AdapterError::Semantic(format!(
            "{POSITION} for {name} is not a number: {other}"
        ))),
    }
}

fn get_toggle_once<C: LineConnection>(
    exchanger: &mut Exchanger<C>,
    diagnostics: &mut Diagnostics,
    name: &str,
) -> Result<String> {
    let response = exchanger.exchange(CONTROL_GET, &json!([name]), diagnostics)?;

    match control_field(&response, name, VALUE)? {
        None => Ok(UNKNOWN.to_string()),
        Some(value) => toggle_from_wire(name, value).map(str::to_string),
    }
}

fn get_video_route_once<C: LineConnection>(
    exchanger: &mut Exchanger<C>,
    diagnostics: &mut Diagnostics,
    target: &str,
) -> Result<String> {
    let route = RouteTarget::parse(target)?;
    let params = json!({"Name": route.component});
    let response = exchanger.exchange(COMPONENT_GET_CONTROLS, &params, diagnostics)?;

    let controls = match &response.result {
        None => &[][..],
        Some(result) => result
            .get("Controls")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AdapterError::Semantic(format!(
                    "{COMPONENT_GET_CONTROLS} result for {} has no Controls array",
                    route.component
                ))
            })?,
    };

    route.selected_input(controls).ok_or_else(|| {
        AdapterError::Semantic(format!(
            "{} has no inputs that are true with output set to {}",
            route.component, route.output
        ))
    })
}

/// Field `field` of the first control in a `Control.Get` result.
///
/// `None` when the result, the control or the field is absent.
fn control_field<'r>(response: &'r Response, name: &str, field: &str) -> Result<Option<&'r Value>> {
    let Some(result) = &response.result else {
        return Ok(None);
    };

    let controls = result.as_array().ok_or_else(|| {
        AdapterError::Semantic(format!("{CONTROL_GET} result for {name} is not an array"))
    })?;

    match controls.first() {
        None => Ok(None),
        Some(Value::Object(control)) => Ok(control.get(field)),
        Some(other) => Err(AdapterError::Semantic(format!(
            "{CONTROL_GET} result for {name} holds a non-object control: {other}"
        ))),
    }
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

/// Convert a percentage string to a QRC `Position`.
pub fn percent_to_position(percent: &str) -> Result<f64> {
    let raw = strip_quotes(percent);
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| AdapterError::invalid_input("volume", raw, format!("{err}")))?;

    if !value.is_finite() {
        return Err(AdapterError::invalid_input(
            "volume",
            raw,
            "volume must be a finite number",
        ));
    }

    Ok(value / 100.0)
}

/// Convert a QRC `Position` to a percentage string.
///
/// The percentage is rounded to six decimal places and printed without a
/// trailing `.0`.
pub fn position_to_percent(position: f64) -> String {
    let percent = (position * 100.0 * 1e6).round() / 1e6;
    if percent == 0.0 {
        return "0".to_string();
    }
    format!("{percent}")
}

/// Convert `"true"`/`"false"` (any case, optionally quoted) to a QRC `Value`.
pub fn toggle_to_wire(state: &str) -> Result<u8> {
    let raw = strip_quotes(state);
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(1),
        "false" => Ok(0),
        _ => Err(AdapterError::invalid_input(
            "toggle state",
            raw,
            "expected true or false",
        )),
    }
}

/// Convert a QRC `Value` to `"true"`/`"false"`; anything but 0 or 1 is rejected.
pub fn toggle_from_wire(name: &str, value: &Value) -> Result<&'static str> {
    match value.as_f64() {
        Some(v) if v == 1.0 => Ok("true"),
        Some(v) if v == 0.0 => Ok("false"),
        _ => Err(AdapterError::Semantic(format!(
            "result value for {name} was not 0 or 1: {value}"
        ))),
    }
}

/// A router output addressed as `"<component>_<output>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget<'a> {
    /// Component holding the router controls, e.g. `dec1`
    pub component: &'a str,
    /// Output path, e.g. `hdmi.out.1`
    pub output: &'a str,
}

impl<'a> RouteTarget<'a> {
    /// Split a target at its first underscore.
    pub fn parse(target: &'a str) -> Result<Self> {
        match strip_quotes(target).split_once('_') {
            Some((component, output)) if !component.is_empty() && !output.is_empty() => {
                Ok(Self { component, output })
            }
            _ => Err(AdapterError::invalid_input(
                "video route target",
                target,
                "expected <component>_<output>",
            )),
        }
    }

    /// Control that selects `input` on this output
    pub fn control_for(&self, input: &str) -> String {
        format!("{}{ROUTE_SELECT}{input}", self.output)
    }

    /// The input whose select control is on, if any.
    pub fn selected_input(&self, controls: &[Value]) -> Option<String> {
        controls.iter().find_map(|control| {
            let name = control.get("Name")?.as_str()?;
            let input = name
                .strip_prefix(self.output)?
                .strip_prefix(ROUTE_SELECT)?;

            if input.is_empty() || input.contains(ROUTE_SELECT) {
                return None;
            }

            is_selected(control.get(VALUE)?).then(|| input.to_string())
        })
    }
}

fn is_selected(value: &Value) -> bool {
    match value {
        Value::Bool(on) => *on,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}
