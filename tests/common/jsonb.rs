//! Evaluator for the jsonb expressions that patch updates assign to `body`
//!
//! Follows PostgreSQL: `jsonb_set` creates only the last key of a path and
//! leaves the target alone when a parent is missing, `jsonb_insert` refuses
//! to replace an object key, `#>` yields null for a missing path, and the
//! functions return null on a null argument.
use dbspace::{DbError, Result, Value};
use serde_json::Value as JsonValue;

/// Evaluate `expr` against the stored `body`. `None` is SQL null.
pub fn evaluate(expr: &str, body: &JsonValue, params: &[Value]) -> Result<Option<JsonValue>> {
    let mut parser = Parser {
        tokens: tokenize(expr)?,
        pos: 0,
        body,
        params,
    };
    let datum = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(unsupported(&format!("trailing input in {}", expr)));
    }
    match datum {
        Datum::Null => Ok(None),
        Datum::Json(json) => Ok(Some(json)),
        other => Err(unsupported(&format!("non-jsonb result {:?}", other))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Datum {
    Null,
    Bool(bool),
    Text(String),
    Path(Vec<String>),
    Json(JsonValue),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Param(usize),
    Literal(String),
    Cast,
    Open,
    Close,
    Comma,
    Op(&'static str),
}

fn unsupported(what: &str) -> DbError {
    DbError::ExecutionError(format!("unsupported expression: {}", what))
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            ' ' => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' if next == Some(':') => {
                tokens.push(Token::Cast);
                i += 2;
            }
            '#' if next == Some('>') => {
                tokens.push(Token::Op("#>"));
                i += 2;
            }
            '#' if next == Some('-') => {
                tokens.push(Token::Op("#-"));
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Op("||"));
                i += 2;
            }
            '$' => {
                let start = i + 1;
                i = start;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let n = digits.parse().map_err(|_| unsupported("bad placeholder"))?;
                tokens.push(Token::Param(n));
            }
            '\'' => {
                let mut literal = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            literal.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(c) => {
                            literal.push(*c);
                            i += 1;
                        }
                        None => return Err(unsupported("unterminated literal")),
                    }
                }
                tokens.push(Token::Literal(literal));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let mut word: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'[') && chars.get(i + 1) == Some(&']') {
                    word.push_str("[]");
                    i += 2;
                }
                tokens.push(Token::Word(word));
            }
            c => return Err(unsupported(&format!("character {:?}", c))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    body: &'a JsonValue,
    params: &'a [Value],
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            other => Err(unsupported(&format!("expected {:?}, got {:?}", token, other))),
        }
    }

    /// Operators are left-associative with equal precedence.
    fn expr(&mut self) -> Result<Datum> {
        let mut left = self.primary()?;
        while let Some(Token::Op(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.primary()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Datum> {
        let mut datum = self.atom()?;
        while self.peek() == Some(&Token::Cast) {
            self.pos += 1;
            match self.next() {
                Some(Token::Word(ty)) => datum = cast(datum, &ty)?,
                other => return Err(unsupported(&format!("cast to {:?}", other))),
            }
        }
        Ok(datum)
    }

    fn atom(&mut self) -> Result<Datum> {
        match self.next() {
            Some(Token::Param(n)) => {
                let param = n.checked_sub(1).and_then(|i| self.params.get(i));
                match param {
                    Some(Value::Null) => Ok(Datum::Null),
                    Some(Value::Text(s)) => Ok(Datum::Text(s.clone())),
                    Some(Value::Integer(i)) => Ok(Datum::Text(i.to_string())),
                    Some(Value::Json(json)) => Ok(Datum::Json(json.clone())),
                    other => Err(unsupported(&format!("param ${} = {:?}", n, other))),
                }
            }
            Some(Token::Literal(s)) => Ok(Datum::Text(s)),
            Some(Token::Word(w)) if w == "body" => Ok(Datum::Json(self.body.clone())),
            Some(Token::Word(w)) if w == "true" => Ok(Datum::Bool(true)),
            Some(Token::Word(w)) if w == "false" => Ok(Datum::Bool(false)),
            Some(Token::Word(name)) => {
                self.expect(Token::Open)?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::Close) {
                    args.push(self.expr()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                        args.push(self.expr()?);
                    }
                }
                self.expect(Token::Close)?;
                call(&name, args)
            }
            other => Err(unsupported(&format!("token {:?}", other))),
        }
    }
}

fn cast(datum: Datum, ty: &str) -> Result<Datum> {
    match (datum, ty) {
        (Datum::Null, _) => Ok(Datum::Null),
        (Datum::Text(s), "text[]") => Ok(Datum::Path(parse_text_array(&s)?)),
        (Datum::Text(s), "jsonb") => Ok(Datum::Json(serde_json::from_str(&s)?)),
        (datum @ Datum::Json(_), "jsonb") => Ok(datum),
        (datum, ty) => Err(unsupported(&format!("cast of {:?} to {}", datum, ty))),
    }
}

fn call(name: &str, args: Vec<Datum>) -> Result<Datum> {
    if name == "coalesce" {
        return Ok(args.into_iter().find(|a| *a != Datum::Null).unwrap_or(Datum::Null));
    }
    if name == "jsonb_build_array" {
        let items = args
            .into_iter()
            .map(|a| match a {
                Datum::Null => Ok(JsonValue::Null),
                Datum::Json(json) => Ok(json),
                other => Err(unsupported(&format!("array element {:?}", other))),
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Datum::Json(JsonValue::Array(items)));
    }
    if args.contains(&Datum::Null) {
        return Ok(Datum::Null);
    }

    match (name, args.as_slice()) {
        ("jsonb_set", [Datum::Json(target), Datum::Path(path), Datum::Json(new)]) => {
            let mut target = target.clone();
            set_path(&mut target, path, new.clone(), true)?;
            Ok(Datum::Json(target))
        }
        ("jsonb_set", [Datum::Json(target), Datum::Path(path), Datum::Json(new), Datum::Bool(create)]) => {
            let mut target = target.clone();
            set_path(&mut target, path, new.clone(), *create)?;
            Ok(Datum::Json(target))
        }
        ("jsonb_insert", [Datum::Json(target), Datum::Path(path), Datum::Json(new)]) => {
            let mut target = target.clone();
            insert_path(&mut target, path, new.clone())?;
            Ok(Datum::Json(target))
        }
        _ => Err(unsupported(&format!("call {}({:?})", name, args))),
    }
}

fn binary(op: &str, left: Datum, right: Datum) -> Result<Datum> {
    match (op, left, right) {
        (_, Datum::Null, _) | (_, _, Datum::Null) => Ok(Datum::Null),
        ("#>", Datum::Json(target), Datum::Path(path)) => Ok(get_path(&target, &path)
            .cloned()
            .map(Datum::Json)
            .unwrap_or(Datum::Null)),
        ("#-", Datum::Json(mut target), Datum::Path(path)) => {
            delete_path(&mut target, &path)?;
            Ok(Datum::Json(target))
        }
        ("||", Datum::Json(a), Datum::Json(b)) => Ok(Datum::Json(concat(a, b))),
        (op, l, r) => Err(unsupported(&format!("{:?} {} {:?}", l, op, r))),
    }
}

/// `{"a","b"}` gives `["a", "b"]`
fn parse_text_array(literal: &str) -> Result<Vec<String>> {
    let inner = literal
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| unsupported(&format!("array literal {}", literal)))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            '"' => quoted = !quoted,
            ',' if !quoted => elements.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    elements.push(current);
    Ok(elements)
}

fn array_index(segment: &str) -> Result<i64> {
    segment.parse().map_err(|_| {
        DbError::ExecutionError(format!("path element \"{}\" is not an integer", segment))
    })
}

/// In-range position for a possibly negative index
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

fn get_path<'a>(target: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(target, |node, segment| match node {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => {
            let index = segment.parse().ok()?;
            items.get(resolve_index(index, items.len())?)
        }
        _ => None,
    })
}

fn set_path(target: &mut JsonValue, path: &[String], new: JsonValue, create: bool) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };
    match target {
        JsonValue::Object(map) if rest.is_empty() => {
            if create || map.contains_key(head) {
                map.insert(head.clone(), new);
            }
        }
        JsonValue::Object(map) => {
            if let Some(child) = map.get_mut(head) {
                set_path(child, rest, new, create)?;
            }
        }
        JsonValue::Array(items) => {
            let index = array_index(head)?;
            match resolve_index(index, items.len()) {
                Some(i) if rest.is_empty() => items[i] = new,
                Some(i) => set_path(&mut items[i], rest, new, create)?,
                None if rest.is_empty() && create => {
                    if index < 0 {
                        items.insert(0, new);
                    } else {
                        items.push(new);
                    }
                }
                None => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn insert_path(target: &mut JsonValue, path: &[String], new: JsonValue) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };
    match target {
        JsonValue::Object(map) if rest.is_empty() => {
            if map.contains_key(head) {
                return Err(DbError::ExecutionError("cannot replace existing key".into()));
            }
            map.insert(head.clone(), new);
        }
        JsonValue::Object(map) => {
            if let Some(child) = map.get_mut(head) {
                insert_path(child, rest, new)?;
            }
        }
        JsonValue::Array(items) => {
            let index = array_index(head)?;
            match resolve_index(index, items.len()) {
                Some(i) if rest.is_empty() => items.insert(i, new),
                Some(i) => insert_path(&mut items[i], rest, new)?,
                None if rest.is_empty() && index < 0 => items.insert(0, new),
                None if rest.is_empty() => items.push(new),
                None => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn delete_path(target: &mut JsonValue, path: &[String]) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };
    match target {
        JsonValue::Object(map) if rest.is_empty() => {
            map.remove(head);
        }
        JsonValue::Object(map) => {
            if let Some(child) = map.get_mut(head) {
                delete_path(child, rest)?;
            }
        }
        JsonValue::Array(items) => {
            let index = array_index(head)?;
            match resolve_index(index, items.len()) {
                Some(i) if rest.is_empty() => {
                    items.remove(i);
                }
                Some(i) => delete_path(&mut items[i], rest)?,
                None => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn concat(left: JsonValue, right: JsonValue) -> JsonValue {
    match (left, right) {
        (JsonValue::Object(mut a), JsonValue::Object(b)) => {
            a.extend(b);
            JsonValue::Object(a)
        }
        (JsonValue::Array(mut a), JsonValue::Array(b)) => {
            a.extend(b);
            JsonValue::Array(a)
        }
        (JsonValue::Array(mut a), b) => {
            a.push(b);
            JsonValue::Array(a)
        }
        (a, JsonValue::Array(mut b)) => {
            b.insert(0, a);
            JsonValue::Array(b)
        }
        (a, b) => JsonValue::Array(vec![a, b]),
    }
}

