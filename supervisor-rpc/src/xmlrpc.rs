//! Just enough XML-RPC to call supervisord.
//!
//! supervisord's control API speaks XML-RPC over HTTP POST. This module
//! encodes parameterless method calls and decodes `<methodResponse>`
//! documents into a [`Value`] tree, turning `<fault>` responses into
//! [`DecodeOutcome::Fault`].

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::vec::IntoIter;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::XmlRpcError;

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    DateTime(String),
    Base64(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
        }
    }
}

/// Result of decoding a `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// The single return value.
    Success(Value),
    /// The server raised a fault.
    Fault { code: i64, message: String },
}

/// Encode a method call without parameters.
pub fn encode_call(method: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodCall><methodName>{}</methodName><params></params></methodCall>\n",
        escape_text(method)
    )
}

/// Decode a `<methodResponse>` document.
pub fn decode_response(body: &str) -> Result<DecodeOutcome, XmlRpcError> {
    let mut parser = Parser::new(tokenize(body)?);

    parser.expect_open("methodResponse")?;
    let outcome = match parser.next_tag()? {
        Token::Open(tag) if tag == "params" => {
            parser.expect_open("param")?;
            let value = parser.parse_value()?;
            parser.expect_close("param")?;
            parser.expect_close("params")?;
            DecodeOutcome::Success(value)
        }
        Token::Open(tag) if tag == "fault" => {
            let value = parser.parse_value()?;
            parser.expect_close("fault")?;
            fault_from_value(value)?
        }
        other => return Err(unexpected("<params> or <fault>", &other)),
    };
    parser.expect_close("methodResponse")?;

    Ok(outcome)
}

fn fault_from_value(value: Value) -> Result<DecodeOutcome, XmlRpcError> {
    let members = match value {
        Value::Struct(members) => members,
        other => {
            return Err(XmlRpcError::Shape(format!(
                "fault value is {}, expected struct",
                other.kind()
            )))
        }
    };

    let code = members
        .get("faultCode")
        .and_then(Value::as_i64)
        .ok_or_else(|| XmlRpcError::Shape("fault without integer faultCode".to_string()))?;
    let message = members
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(DecodeOutcome::Fault { code, message })
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Open(tag) => format!("<{}>", tag),
            Token::Close(tag) => format!("</{}>", tag),
            Token::Empty(tag) => format!("<{}/>", tag),
            Token::Text(text) => format!("text {:?}", text),
        }
    }
}

fn unexpected(expected: &str, found: &Token) -> XmlRpcError {
    XmlRpcError::Unexpected {
        expected: expected.to_string(),
        found: found.describe(),
    }
}

fn tag_name(raw: &[u8]) -> Result<String, XmlRpcError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| XmlRpcError::Xml(e.to_string()))
}

/// Flatten the document into owned tokens, dropping declarations,
/// comments and processing instructions.
fn tokenize(xml: &str) -> Result<Vec<Token>, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlRpcError::Xml(e.to_string()))?;
        match event {
            Event::Start(e) => tokens.push(Token::Open(tag_name(e.name().as_ref())?)),
            Event::End(e) => tokens.push(Token::Close(tag_name(e.name().as_ref())?)),
            Event::Empty(e) => tokens.push(Token::Empty(tag_name(e.name().as_ref())?)),
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| XmlRpcError::Xml(e.to_string()))?;
                tokens.push(Token::Text(text.into_owned()));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                tokens.push(Token::Text(text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.tokens.peek(), Some(Token::Text(t)) if t.trim().is_empty()) {
            self.tokens.next();
        }
    }

    /// Next token that is not inter-element whitespace.
    fn next_tag(&mut self) -> Result<Token, XmlRpcError> {
        self.skip_whitespace();
        self.tokens.next().ok_or(XmlRpcError::UnexpectedEof)
    }

    fn expect_open(&mut self, name: &str) -> Result<(), XmlRpcError> {
        match self.next_tag()? {
            Token::Open(tag) if tag == name => Ok(()),
            other => Err(unexpected(&format!("<{}>", name), &other)),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), XmlRpcError> {
        match self.next_tag()? {
            Token::Close(tag) if tag == name => Ok(()),
            other => Err(unexpected(&format!("</{}>", name), &other)),
        }
    }

    /// Parse a `<value>` element, open or self-closing.
    fn parse_value(&mut self) -> Result<Value, XmlRpcError> {
        match self.next_tag()? {
            Token::Open(tag) if tag == "value" => self.parse_value_body(),
            Token::Empty(tag) if tag == "value" => Ok(Value::String(String::new())),
            other => Err(unexpected("<value>", &other)),
        }
    }

    /// Contents of `<value>` up to and including `</value>`.
    /// Untyped content is a string.
    fn parse_value_body(&mut self) -> Result<Value, XmlRpcError> {
        let mut text = String::new();
        loop {
            match self.tokens.next().ok_or(XmlRpcError::UnexpectedEof)? {
                Token::Text(t) => text.push_str(&t),
                Token::Close(tag) if tag == "value" => return Ok(Value::String(text)),
                Token::Open(tag) => {
                    if !text.trim().is_empty() {
                        return Err(XmlRpcError::Unexpected {
                            expected: "value content".to_string(),
                            found: format!("text {:?} before <{}>", text, tag),
                        });
                    }
                    let value = self.parse_typed(&tag)?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                Token::Empty(tag) => {
                    let value = empty_typed(&tag)?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                other => return Err(unexpected("</value>", &other)),
            }
        }
    }

    fn parse_typed(&mut self, tag: &str) -> Result<Value, XmlRpcError> {
        match tag {
            "int" | "i4" | "i8" => {
                let text = self.scalar_text(tag)?;
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| XmlRpcError::InvalidScalar {
                        kind: "int",
                        value: text,
                    })
            }
            "boolean" => {
                let text = self.scalar_text(tag)?;
                match text.trim() {
                    "1" => Ok(Value::Bool(true)),
                    "0" => Ok(Value::Bool(false)),
                    _ => Err(XmlRpcError::InvalidScalar {
                        kind: "boolean",
                        value: text,
                    }),
                }
            }
            "double" => {
                let text = self.scalar_text(tag)?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| XmlRpcError::InvalidScalar {
                        kind: "double",
                        value: text,
                    })
            }
            "string" => self.scalar_text(tag).map(Value::String),
            "dateTime.iso8601" => self
                .scalar_text(tag)
                .map(|t| Value::DateTime(t.trim().to_string())),
            "base64" => self
                .scalar_text(tag)
                .map(|t| Value::Base64(t.trim().to_string())),
            "nil" => self.scalar_text(tag).map(|_| Value::Nil),
            "array" => self.parse_array(),
            "struct" => self.parse_struct(),
            other => Err(XmlRpcError::UnknownType(other.to_string())),
        }
    }

    /// Text content up to the closing tag.
    fn scalar_text(&mut self, tag: &str) -> Result<String, XmlRpcError> {
        let mut text = String::new();
        loop {
            match self.tokens.next().ok_or(XmlRpcError::UnexpectedEof)? {
                Token::Text(t) => text.push_str(&t),
                Token::Close(close) if close == tag => return Ok(text),
                other => return Err(unexpected(&format!("</{}>", tag), &other)),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, XmlRpcError> {
        let mut items = Vec::new();

        match self.next_tag()? {
            Token::Empty(tag) if tag == "data" => {}
            Token::Open(tag) if tag == "data" => loop {
                match self.next_tag()? {
                    Token::Open(tag) if tag == "value" => items.push(self.parse_value_body()?),
                    Token::Empty(tag) if tag == "value" => items.push(Value::String(String::new())),
                    Token::Close(tag) if tag == "data" => break,
                    other => return Err(unexpected("<value> or </data>", &other)),
                }
            },
            other => return Err(unexpected("<data>", &other)),
        }
        self.expect_close("array")?;

        Ok(Value::Array(items))
    }

    fn parse_struct(&mut self) -> Result<Value, XmlRpcError> {
        let mut members = BTreeMap::new();

        loop {
            match self.next_tag()? {
                Token::Open(tag) if tag == "member" => {
                    self.expect_open("name")?;
                    let name = self.scalar_text("name")?;
                    let value = self.parse_value()?;
                    self.expect_close("member")?;
                    members.insert(name.trim().to_string(), value);
                }
                Token::Close(tag) if tag == "struct" => break,
                other => return Err(unexpected("<member> or </struct>", &other)),
            }
        }

        Ok(Value::Struct(members))
    }
}

fn empty_typed(tag: &str) -> Result<Value, XmlRpcError> {
    match tag {
        "string" => Ok(Value::String(String::new())),
        "nil" => Ok(Value::Nil),
        "base64" => Ok(Value::Base64(String::new())),
        "struct" => Ok(Value::Struct(BTreeMap::new())),
        "int" | "i4" | "i8" | "boolean" | "double" => Err(XmlRpcError::InvalidScalar {
            kind: "empty",
            value: tag.to_string(),
        }),
        other => Err(XmlRpcError::UnknownType(other.to_string())),
    }
}
