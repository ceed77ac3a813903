use jsonschema::JSONSchema;
use serde_json::Value;

use crate::toolcall::error::{
    ToolCallError, malformed_directive, unknown_argument, unknown_tool,
};
use crate::toolcall::types::{
    ParsedDirective, ParsedOutput, Segment, TOOL_CHECK_HALLUCINATION, TOOL_GET_CRISIS_RESOURCES,
    TOOL_LOG_INCIDENT, TOOL_NAMES, ToolDirective,
};
use crate::types::{ChannelKind, Region, SituationType};

const MARKER: &str = "[TOOL_CALL:";

/// Lex `[TOOL_CALL: name(k=v, ...)]` occurrences out of model text.
///
/// The grammar is text, not structured data, and models are sloppy with it:
/// the lexer tolerates arbitrary whitespace, single or double quotes, bare
/// values, and trailing commas. Anything that starts the marker but does not
/// finish it correctly fails the whole parse; the caller substitutes a
/// fallback response and flags the turn.
pub fn parse(text: &str) -> Result<ParsedOutput, ToolCallError> {
    let mut output = ParsedOutput::default();
    let mut cursor = 0usize;

    while let Some(offset) = text[cursor..].find(MARKER) {
        let start = cursor + offset;
        if start > cursor {
            output
                .segments
                .push(Segment::Text(text[cursor..start].to_string()));
        }

        let mut lexer = Lexer {
            text,
            pos: start + MARKER.len(),
        };
        let directive = lexer.directive()?;
        let raw = text[start..lexer.pos].to_string();

        output.segments.push(Segment::Directive(output.directives.len()));
        output.directives.push(ParsedDirective { directive, raw });
        cursor = lexer.pos;
    }

    if cursor < text.len() {
        output
            .segments
            .push(Segment::Text(text[cursor..].to_string()));
    }
    Ok(output)
}

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Str(String),
    Object(Value),
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn directive(&mut self) -> Result<ToolDirective, ToolCallError> {
        self.skip_ws();
        let name = self.ident()?;
        if !TOOL_NAMES.contains(&name.as_str()) {
            return Err(unknown_tool(format!("unknown tool '{}'", name)));
        }

        self.skip_ws();
        self.expect('(')?;
        let args = self.args()?;
        self.skip_ws();
        self.expect(']')?;

        build_directive(&name, args)
    }

    fn args(&mut self) -> Result<Vec<(String, ArgValue)>, ToolCallError> {
        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(')') {
                self.pos += 1;
                return Ok(args);
            }
            let key = self.ident()?;
            self.skip_ws();
            self.expect('=')?;
            self.skip_ws();
            let value = self.value()?;
            args.push((key, value));

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(')') => {
                    self.pos += 1;
                    return Ok(args);
                }
                other => {
                    return Err(malformed_directive(format!(
                        "expected ',' or ')' in argument list, found {:?}",
                        other
                    )));
                }
            }
        }
    }

    fn value(&mut self) -> Result<ArgValue, ToolCallError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                let Some(end) = self.text[start..].find(quote) else {
                    return Err(malformed_directive("unterminated quoted value"));
                };
                let value = self.text[start..start + end].to_string();
                self.pos = start + end + 1;
                Ok(ArgValue::Str(value))
            }
            Some('{') => {
                let raw = self.balanced_object()?;
                let normalized = raw.replace('\'', "\"");
                let value: Value = serde_json::from_str(&normalized).map_err(|err| {
                    malformed_directive(format!("unparseable object literal: {err}"))
                })?;
                if !value.is_object() {
                    return Err(malformed_directive("object literal expected"));
                }
                Ok(ArgValue::Object(value))
            }
            Some(_) => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == ',' || c == ')' || c.is_whitespace() {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                if self.pos == start {
                    return Err(malformed_directive("empty argument value"));
                }
                Ok(ArgValue::Str(self.text[start..self.pos].to_string()))
            }
            None => Err(malformed_directive("unterminated directive")),
        }
    }

    fn balanced_object(&mut self) -> Result<String, ToolCallError> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut in_quote: Option<char> = None;
        for (offset, c) in self.text[start..].char_indices() {
            match in_quote {
                Some(quote) => {
                    if c == quote {
                        in_quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' => in_quote = Some(c),
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            let end = start + offset + c.len_utf8();
                            self.pos = end;
                            return Ok(self.text[start..end].to_string());
                        }
                    }
                    _ => {}
                },
            }
        }
        Err(malformed_directive("unbalanced object literal"))
    }

    fn ident(&mut self) -> Result<String, ToolCallError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(malformed_directive("identifier expected"));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn expect(&mut self, expected: char) -> Result<(), ToolCallError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            other => Err(malformed_directive(format!(
                "expected '{}', found {:?}",
                expected, other
            ))),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }
}

fn build_directive(
    name: &str,
    args: Vec<(String, ArgValue)>,
) -> Result<ToolDirective, ToolCallError> {
    match name {
        TOOL_GET_CRISIS_RESOURCES => {
            let mut region = None;
            let mut situation = None;
            for (key, value) in args {
                match (key.as_str(), value) {
                    ("region", ArgValue::Str(text)) => region = Some(Region::parse_or_global(&text)),
                    ("situation_type", ArgValue::Str(text)) => {
                        situation = Some(text.parse::<SituationType>().map_err(|_| {
                            malformed_directive(format!("invalid situation_type '{}'", text))
                        })?);
                    }
                    (key, _) => {
                        return Err(unknown_argument(format!(
                            "unknown argument '{}' for get_crisis_resources",
                            key
                        )));
                    }
                }
            }
            let situation_type = situation
                .ok_or_else(|| malformed_directive("get_crisis_resources requires situation_type"))?;
            Ok(ToolDirective::GetCrisisResources {
                region,
                situation_type,
            })
        }
        TOOL_CHECK_HALLUCINATION => {
            let mut resource = None;
            let mut kind = None;
            for (key, value) in args {
                match (key.as_str(), value) {
                    ("resource", ArgValue::Str(text)) => resource = Some(text),
                    ("type", ArgValue::Str(text)) => {
                        kind = Some(text.parse::<ChannelKind>().map_err(|_| {
                            malformed_directive(format!("invalid resource type '{}'", text))
                        })?);
                    }
                    (key, _) => {
                        return Err(unknown_argument(format!(
                            "unknown argument '{}' for check_hallucination",
                            key
                        )));
                    }
                }
            }
            Ok(ToolDirective::CheckHallucination {
                resource: resource
                    .ok_or_else(|| malformed_directive("check_hallucination requires resource"))?,
                kind: kind.unwrap_or(ChannelKind::Phone),
            })
        }
        TOOL_LOG_INCIDENT => {
            let mut incident_data = None;
            for (key, value) in args {
                match (key.as_str(), value) {
                    ("incident_data", ArgValue::Object(object)) => incident_data = Some(object),
                    ("incident_data", ArgValue::Str(_)) => {
                        return Err(malformed_directive(
                            "incident_data must be an object literal",
                        ));
                    }
                    (key, _) => {
                        return Err(unknown_argument(format!(
                            "unknown argument '{}' for log_incident",
                            key
                        )));
                    }
                }
            }
            let incident_data = incident_data
                .ok_or_else(|| malformed_directive("log_incident requires incident_data"))?;
            validate_incident_data(&incident_data)?;
            Ok(ToolDirective::LogIncident { incident_data })
        }
        _ => Err(unknown_tool(format!("unknown tool '{}'", name))),
    }
}

fn validate_incident_data(incident_data: &Value) -> Result<(), ToolCallError> {
    let schema = serde_json::json!({
        "type": "object",
        "required": ["type", "severity"],
        "properties": {
            "type": { "type": "string" },
            "severity": { "type": "string" }
        }
    });
    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| malformed_directive(format!("incident schema failed to compile: {err}")))?;
    if compiled.validate(incident_data).is_err() {
        return Err(malformed_directive(
            "incident_data must carry string fields 'type' and 'severity'",
        ));
    }
    Ok(())
}
