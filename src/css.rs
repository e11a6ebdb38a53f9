//! CSS selector to XPath 1.0 translation.
//!
//! The output follows the shape produced by `cssselect`'s generic translator:
//! every selector is anchored with `descendant-or-self::`, groups are joined
//! with ` | `, and simple selectors become predicates on the element test.
//!
//! ```text
//! ul > li.item:first-child
//! => descendant-or-self::ul/li[(@class and contains(concat(' ', normalize-space(@class), ' '), ' item ')) and (count(preceding-sibling::*) = 0)]
//! ```
//!
//! Anything outside the supported subset is a [`CssError`]; callers treat that as
//! "not CSS" and fall back to XPath.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CssError;

/// `an+b`, `-n+b`, `n`, or a plain integer, whitespace already removed.
static NTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<a>[+-]?\d*)n(?P<b>[+-]\d+)?|(?P<only>[+-]?\d+))$").unwrap()
});

/// Translates a CSS selector group into an XPath expression.
pub fn css_to_xpath(css: &str) -> Result<String, CssError> {
    let mut parser = Parser::new(Lexer::new(css))?;
    let selectors = parser.parse_group()?;

    Ok(selectors
        .iter()
        .map(|expr| format!("descendant-or-self::{expr}"))
        .collect::<Vec<_>>()
        .join(" | "))
}

/// Quotes a string as an XPath literal.
///
/// XPath 1.0 has no escapes, so a value holding both quote kinds is assembled
/// with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Identifier immediately followed by `(`; the parenthesis is consumed.
    Function(String),
    Hash(String),
    String(String),
    Whitespace,
    Dot,
    Star,
    Comma,
    Colon,
    Gt,
    Plus,
    Tilde,
    LBracket,
    RBracket,
    Equals,
    Includes,
    DashMatch,
    PrefixMatch,
    SuffixMatch,
    SubstringMatch,
    Eof,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>) -> CssError {
        CssError::new(message, self.position)
    }

    fn is_name_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
    }

    fn starts_identifier(&self) -> bool {
        match (self.current_char(), self.peek_char(1)) {
            (Some(c), _) if c.is_alphabetic() || c == '_' || !c.is_ascii() => true,
            (Some('\\'), Some(_)) => true,
            (Some('-'), Some(c)) => c.is_alphabetic() || c == '_' || c == '-' || c == '\\',
            _ => false,
        }
    }

    fn read_name(&mut self) -> Result<String, CssError> {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '\\' {
                self.advance();
                match self.current_char() {
                    Some(escaped) => result.push(escaped),
                    None => return Err(self.error("unexpected end of input after backslash")),
                }
                self.advance();
            } else if Self::is_name_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Ok(result)
    }

    fn read_string(&mut self, quote: char) -> Result<String, CssError> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some(escaped) => result.push(escaped),
                        None => return Err(self.error("unterminated string")),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("unterminated string"))
    }

    /// Reads the raw text of a functional pseudo-class argument up to the
    /// matching `)`, which is consumed.
    pub fn read_arguments(&mut self) -> Result<String, CssError> {
        let mut result = String::new();
        let mut depth = 0usize;

        while let Some(ch) = self.current_char() {
            match ch {
                '"' | '\'' => {
                    let start = self.position;
                    self.read_string(ch)?;
                    result.extend(&self.input[start..self.position]);
                    continue;
                }
                '(' => depth += 1,
                ')' if depth == 0 => {
                    self.advance();
                    return Ok(result);
                }
                ')' => depth -= 1,
                _ => {}
            }
            result.push(ch);
            self.advance();
        }

        Err(self.error("unclosed '('"))
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// `op` alone, or `op_eq` when followed by `=`.
    fn with_equals(&mut self, op: Option<Token>, op_eq: Token) -> Result<Token, CssError> {
        if self.peek_char(1) == Some('=') {
            self.advance();
            self.advance();
            return Ok(op_eq);
        }
        match op {
            Some(token) => Ok(self.single(token)),
            None => Err(self.error(format!(
                "unexpected character '{}'",
                self.current_char().unwrap_or(' ')
            ))),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, CssError> {
        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        if ch.is_whitespace() {
            while self.current_char().is_some_and(char::is_whitespace) {
                self.advance();
            }
            return Ok(Token::Whitespace);
        }

        if self.starts_identifier() {
            let name = self.read_name()?;
            if self.current_char() == Some('(') {
                self.advance();
                return Ok(Token::Function(name));
            }
            return Ok(Token::Ident(name));
        }

        match ch {
            '#' => {
                self.advance();
                let name = self.read_name()?;
                if name.is_empty() {
                    return Err(self.error("expected a name after '#'"));
                }
                Ok(Token::Hash(name))
            }
            '"' | '\'' => Ok(Token::String(self.read_string(ch)?)),
            '.' => Ok(self.single(Token::Dot)),
            ',' => Ok(self.single(Token::Comma)),
            ':' => Ok(self.single(Token::Colon)),
            '>' => Ok(self.single(Token::Gt)),
            '+' => Ok(self.single(Token::Plus)),
            '[' => Ok(self.single(Token::LBracket)),
            ']' => Ok(self.single(Token::RBracket)),
            '=' => Ok(self.single(Token::Equals)),
            '*' => self.with_equals(Some(Token::Star), Token::SubstringMatch),
            '~' => self.with_equals(Some(Token::Tilde), Token::Includes),
            '|' => self.with_equals(None, Token::DashMatch),
            '^' => self.with_equals(None, Token::PrefixMatch),
            '$' => self.with_equals(None, Token::SuffixMatch),
            _ => Err(self.error(format!("unexpected character '{ch}'"))),
        }
    }
}

/// A location path under construction: `path` + `element` + predicates.
#[derive(Debug, Clone)]
struct XPathExpr {
    path: String,
    element: String,
    conditions: Vec<String>,
}

impl XPathExpr {
    fn new(element: impl Into<String>) -> Self {
        XPathExpr {
            path: String::new(),
            element: element.into(),
            conditions: Vec::new(),
        }
    }

    fn add_condition(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    /// Moves the element name into a predicate so the step can use `*`.
    fn add_name_test(&mut self) {
        if self.element != "*" {
            let test = format!("name() = {}", xpath_literal(&self.element));
            self.conditions.insert(0, test);
            self.element = "*".to_string();
        }
    }

    fn join(self, combiner: &str, other: XPathExpr) -> XPathExpr {
        XPathExpr {
            path: format!("{self}{combiner}{}", other.path),
            element: other.element,
            conditions: other.conditions,
        }
    }

    /// The predicate body for use inside `not()`.
    fn as_condition(&self) -> String {
        let mut parts = Vec::new();
        if self.element != "*" {
            parts.push(format!("name() = {}", xpath_literal(&self.element)));
        }
        parts.extend(self.conditions.iter().cloned());
        join_conditions(&parts).unwrap_or_else(|| "1".to_string())
    }
}

impl fmt::Display for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.element)?;
        if let Some(predicate) = join_conditions(&self.conditions) {
            write!(f, "[{predicate}]")?;
        }
        Ok(())
    }
}

fn join_conditions(conditions: &[String]) -> Option<String> {
    match conditions {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(
            many.iter()
                .map(|c| format!("({c})"))
                .collect::<Vec<_>>()
                .join(" and "),
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

struct Parser {
    lexer: Lexer,
    current_token: Token,
}

impl Parser {
    fn new(mut lexer: Lexer) -> Result<Self, CssError> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
        })
    }

    fn advance(&mut self) -> Result<(), CssError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> CssError {
        CssError::new(message, self.lexer.position())
    }

    fn skip_whitespace(&mut self) -> Result<bool, CssError> {
        let mut skipped = false;
        while self.current_token == Token::Whitespace {
            skipped = true;
            self.advance()?;
        }
        Ok(skipped)
    }

    fn parse_group(&mut self) -> Result<Vec<XPathExpr>, CssError> {
        let mut selectors = vec![self.parse_selector()?];

        while self.current_token == Token::Comma {
            self.advance()?;
            selectors.push(self.parse_selector()?);
        }

        match self.current_token {
            Token::Eof => Ok(selectors),
            ref token => Err(self.error(format!("unexpected {token:?}"))),
        }
    }

    fn parse_selector(&mut self) -> Result<XPathExpr, CssError> {
        self.skip_whitespace()?;
        let mut expr = self.parse_compound()?;

        loop {
            let had_whitespace = self.skip_whitespace()?;
            let combinator = match self.current_token {
                Token::Gt => Combinator::Child,
                Token::Plus => Combinator::Adjacent,
                Token::Tilde => Combinator::Sibling,
                Token::Comma | Token::Eof => break,
                _ if had_whitespace => Combinator::Descendant,
                ref token => return Err(self.error(format!("unexpected {token:?}"))),
            };
            if combinator != Combinator::Descendant {
                self.advance()?;
                self.skip_whitespace()?;
            }

            let right = self.parse_compound()?;
            expr = combine(expr, combinator, right);
        }

        Ok(expr)
    }

    fn parse_compound(&mut self) -> Result<XPathExpr, CssError> {
        let mut consumed = false;
        let mut expr = match &self.current_token {
            Token::Ident(name) => {
                let expr = XPathExpr::new(name.clone());
                self.advance()?;
                consumed = true;
                expr
            }
            Token::Star => {
                self.advance()?;
                consumed = true;
                XPathExpr::new("*")
            }
            _ => XPathExpr::new("*"),
        };

        loop {
            match &self.current_token {
                Token::Hash(id) => {
                    expr.add_condition(format!("@id = {}", xpath_literal(id)));
                    self.advance()?;
                }
                Token::Dot => {
                    self.advance()?;
                    let Token::Ident(class) = &self.current_token else {
                        return Err(self.error("expected a class name after '.'"));
                    };
                    expr.add_condition(class_condition("@class", class));
                    self.advance()?;
                }
                Token::LBracket => {
                    self.advance()?;
                    let condition = self.parse_attribute()?;
                    expr.add_condition(condition);
                }
                Token::Colon => {
                    self.advance()?;
                    self.parse_pseudo(&mut expr)?;
                }
                _ => break,
            }
            consumed = true;
        }

        if !consumed {
            return Err(self.error(format!("expected selector, got {:?}", self.current_token)));
        }
        Ok(expr)
    }

    /// Parses the inside of `[...]`; the opening bracket is already consumed.
    fn parse_attribute(&mut self) -> Result<String, CssError> {
        self.skip_whitespace()?;
        let Token::Ident(name) = self.current_token.clone() else {
            return Err(self.error("expected an attribute name"));
        };
        self.advance()?;
        self.skip_whitespace()?;

        let attr = format!("@{name}");
        let operator = self.current_token.clone();
        if operator == Token::RBracket {
            self.advance()?;
            return Ok(attr);
        }

        self.advance()?;
        self.skip_whitespace()?;
        let value = match &self.current_token {
            Token::Ident(v) | Token::String(v) => v.clone(),
            token => return Err(self.error(format!("expected attribute value, got {token:?}"))),
        };
        self.advance()?;
        self.skip_whitespace()?;
        if self.current_token != Token::RBracket {
            return Err(self.error("expected ']'"));
        }
        self.advance()?;

        let condition = match operator {
            Token::Equals => format!("{attr} = {}", xpath_literal(&value)),
            Token::Includes => {
                if value.is_empty() || value.contains(char::is_whitespace) {
                    "0".to_string()
                } else {
                    class_condition(&attr, &value)
                }
            }
            Token::DashMatch => format!(
                "{attr} and ({attr} = {} or starts-with({attr}, {}))",
                xpath_literal(&value),
                xpath_literal(&format!("{value}-"))
            ),
            Token::PrefixMatch if value.is_empty() => "0".to_string(),
            Token::PrefixMatch => {
                format!("{attr} and starts-with({attr}, {})", xpath_literal(&value))
            }
            Token::SuffixMatch if value.is_empty() => "0".to_string(),
            Token::SuffixMatch => format!(
                "{attr} and substring({attr}, string-length({attr})-{}) = {}",
                value.chars().count() - 1,
                xpath_literal(&value)
            ),
            Token::SubstringMatch if value.is_empty() => "0".to_string(),
            Token::SubstringMatch => {
                format!("{attr} and contains({attr}, {})", xpath_literal(&value))
            }
            token => return Err(self.error(format!("unknown attribute operator {token:?}"))),
        };
        Ok(condition)
    }

    /// Parses a pseudo-class; the leading `:` is already consumed.
    fn parse_pseudo(&mut self, expr: &mut XPathExpr) -> Result<(), CssError> {
        match self.current_token.clone() {
            Token::Colon => Err(self.error("pseudo-elements are not supported")),
            Token::Ident(name) => {
                let condition = simple_pseudo(&name.to_ascii_lowercase(), &expr.element)
                    .map_err(|message| self.error(message))?;
                expr.add_condition(condition);
                self.advance()
            }
            Token::Function(name) => {
                let arguments = self.lexer.read_arguments()?;
                let condition = self.functional_pseudo(&name.to_ascii_lowercase(), &arguments, expr)?;
                expr.add_condition(condition);
                self.advance()
            }
            token => Err(self.error(format!("expected pseudo-class, got {token:?}"))),
        }
    }

    fn functional_pseudo(
        &self,
        name: &str,
        arguments: &str,
        expr: &XPathExpr,
    ) -> Result<String, CssError> {
        match name {
            "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                let (a, b) = parse_nth(arguments).map_err(|message| self.error(message))?;
                let last = name.starts_with("nth-last");
                let of_type = if name.ends_with("of-type") {
                    Some(require_element(name, &expr.element).map_err(|m| self.error(m))?)
                } else {
                    None
                };
                Ok(nth_condition(a, b, last, of_type))
            }
            "not" => {
                let mut inner = Parser::new(Lexer::new(arguments))?;
                inner.skip_whitespace()?;
                let negated = inner.parse_compound()?;
                inner.skip_whitespace()?;
                if inner.current_token != Token::Eof {
                    return Err(self.error(":not() accepts a single compound selector"));
                }
                Ok(format!("not({})", negated.as_condition()))
            }
            "contains" => {
                let mut lexer = Lexer::new(arguments.trim());
                let value = match lexer.next_token()? {
                    Token::String(s) | Token::Ident(s) => s,
                    token => return Err(self.error(format!(":contains() expects a string, got {token:?}"))),
                };
                if lexer.next_token()? != Token::Eof {
                    return Err(self.error(":contains() expects a single argument"));
                }
                Ok(format!("contains(string(.), {})", xpath_literal(&value)))
            }
            other => Err(self.error(format!("unsupported pseudo-class :{other}()"))),
        }
    }
}

fn combine(left: XPathExpr, combinator: Combinator, right: XPathExpr) -> XPathExpr {
    match combinator {
        Combinator::Descendant => left.join("/descendant-or-self::*/", right),
        Combinator::Child => left.join("/", right),
        Combinator::Adjacent => {
            let mut expr = left.join("/following-sibling::", right);
            expr.add_name_test();
            expr.add_condition("position() = 1".to_string());
            expr
        }
        Combinator::Sibling => left.join("/following-sibling::", right),
    }
}

fn class_condition(attr: &str, class: &str) -> String {
    format!(
        "{attr} and contains(concat(' ', normalize-space({attr}), ' '), {})",
        xpath_literal(&format!(" {class} "))
    )
}

fn require_element<'e>(pseudo: &str, element: &'e str) -> Result<&'e str, String> {
    if element == "*" {
        Err(format!("*:{pseudo} needs an element name"))
    } else {
        Ok(element)
    }
}

fn simple_pseudo(name: &str, element: &str) -> Result<String, String> {
    let condition = match name {
        "first-child" => "count(preceding-sibling::*) = 0".to_string(),
        "last-child" => "count(following-sibling::*) = 0".to_string(),
        "only-child" => {
            "count(preceding-sibling::*) = 0 and count(following-sibling::*) = 0".to_string()
        }
        "first-of-type" => {
            let element = require_element(name, element)?;
            format!("count(preceding-sibling::{element}) = 0")
        }
        "last-of-type" => {
            let element = require_element(name, element)?;
            format!("count(following-sibling::{element}) = 0")
        }
        "only-of-type" => {
            let element = require_element(name, element)?;
            format!(
                "count(preceding-sibling::{element}) = 0 and count(following-sibling::{element}) = 0"
            )
        }
        "empty" => "not(*) and not(string-length())".to_string(),
        "root" => "not(parent::*)".to_string(),
        other => return Err(format!("unsupported pseudo-class :{other}")),
    };
    Ok(condition)
}

/// Parses an `an+b` expression into `(a, b)`.
fn parse_nth(arguments: &str) -> Result<(i64, i64), String> {
    let compact: String = arguments
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match compact.as_str() {
        "odd" => return Ok((2, 1)),
        "even" => return Ok((2, 0)),
        _ => {}
    }

    let captures = NTH_PATTERN
        .captures(&compact)
        .ok_or_else(|| format!("invalid nth argument '{}'", arguments.trim()))?;

    let number = |text: &str| {
        text.parse::<i64>()
            .map_err(|e| format!("invalid nth argument '{}': {e}", arguments.trim()))
    };

    if let Some(only) = captures.name("only") {
        return Ok((0, number(only.as_str())?));
    }

    let a = match captures.name("a").map(|m| m.as_str()) {
        None | Some("") | Some("+") => 1,
        Some("-") => -1,
        Some(text) => number(text)?,
    };
    let b = match captures.name("b") {
        Some(m) => number(m.as_str())?,
        None => 0,
    };
    Ok((a, b))
}

/// Position test for `:nth-*` pseudo-classes.
///
/// With `count` the number of relevant siblings before (or after, for the
/// `-last` variants) the element, the element matches when `count + 1 = a*n + b`
/// for some `n >= 0`.
fn nth_condition(a: i64, b: i64, last: bool, of_type: Option<&str>) -> String {
    let axis = if last { "following-sibling" } else { "preceding-sibling" };
    let count = format!("count({axis}::{})", of_type.unwrap_or("*"));
    let offset = b - 1;

    if a == 0 {
        return if offset < 0 {
            "0".to_string()
        } else {
            format!("{count} = {offset}")
        };
    }

    if a > 0 {
        return match offset {
            0 => format!("{count} mod {a} = 0"),
            o if o < 0 => format!("({count} + {}) mod {a} = 0", -o),
            o => format!("{count} >= {o} and ({count} - {o}) mod {a} = 0"),
        };
    }

    if offset < 0 {
        "0".to_string()
    } else {
        format!("{count} <= {offset} and ({offset} - {count}) mod {} = 0", -a)
    }
}
