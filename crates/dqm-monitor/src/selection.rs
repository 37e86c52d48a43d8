//! Per-object selection cuts written as strings, e.g. `pt > 20 && abs(eta) < 2.4`.
//!
//! Supports arithmetic (+, -, *, /), comparisons (==, !=, <, <=, >, >=),
//! boolean operators (&&, ||, !) and the functions abs, sqrt, log, exp, pow,
//! min, max. The only variables are the jet kinematics `pt`, `eta`, `phi`.
//! Non-zero positive values count as true.

use dqm_core::{Error, JetCandidate, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Pt,
    Eta,
    Phi,
}

impl Var {
    fn lookup(name: &str) -> Option<Var> {
        match name {
            "pt" => Some(Var::Pt),
            "eta" => Some(Var::Eta),
            "phi" => Some(Var::Phi),
            _ => None,
        }
    }

    fn read(self, jet: &JetCandidate) -> f64 {
        match self {
            Var::Pt => jet.pt,
            Var::Eta => jet.eta,
            Var::Phi => jet.phi,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<(Func, usize)> {
        Some(match name {
            "abs" => (Func::Abs, 1),
            "sqrt" => (Func::Sqrt, 1),
            "log" => (Func::Log, 1),
            "exp" => (Func::Exp, 1),
            "pow" => (Func::Pow, 2),
            "min" => (Func::Min, 2),
            "max" => (Func::Max, 2),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
enum Node {
    Num(f64),
    Var(Var),
    Neg(Box<Node>),
    Not(Box<Node>),
    Bin(Op, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Node {
    fn eval(&self, jet: &JetCandidate) -> f64 {
        match self {
            Node::Num(n) => *n,
            Node::Var(v) => v.read(jet),
            Node::Neg(a) => -a.eval(jet),
            Node::Not(a) => truth(a.eval(jet) <= 0.0),
            Node::Bin(op, a, b) => {
                let (l, r) = (a.eval(jet), b.eval(jet));
                match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div => l / r,
                    Op::Eq => truth((l - r).abs() < f64::EPSILON),
                    Op::Ne => truth((l - r).abs() >= f64::EPSILON),
                    Op::Lt => truth(l < r),
                    Op::Le => truth(l <= r),
                    Op::Gt => truth(l > r),
                    Op::Ge => truth(l >= r),
                    Op::And => truth(l > 0.0 && r > 0.0),
                    Op::Or => truth(l > 0.0 || r > 0.0),
                }
            }
            Node::Call(f, args) => {
                let x = args[0].eval(jet);
                match f {
                    Func::Abs => x.abs(),
                    Func::Sqrt => x.sqrt(),
                    Func::Log => x.ln(),
                    Func::Exp => x.exp(),
                    Func::Pow => x.powf(args[1].eval(jet)),
                    Func::Min => x.min(args[1].eval(jet)),
                    Func::Max => x.max(args[1].eval(jet)),
                }
            }
        }
    }
}

/// A compiled object selection.
#[derive(Debug, Clone)]
pub struct ObjectSelection {
    source: String,
    root: Node,
}

impl ObjectSelection {
    /// Compile `input`. An empty or blank string selects everything.
    pub fn compile(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self { source: String::new(), root: Node::Num(1.0) });
        }
        let tokens = lex(input)?;
        let mut p = CutParser { tokens: &tokens, pos: 0 };
        let root = p.or_expr()?;
        if let Some(t) = p.tokens.get(p.pos) {
            return Err(Error::Selection(format!("'{input}': trailing token {t:?}")));
        }
        Ok(Self { source: input.to_string(), root })
    }

    /// Selection string as configured.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Raw value of the expression for `jet`.
    pub fn value(&self, jet: &JetCandidate) -> f64 {
        self.root.eval(jet)
    }

    /// Whether `jet` passes the selection.
    pub fn accepts(&self, jet: &JetCandidate) -> bool {
        self.value(jet) > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

fn lex(input: &str) -> Result<Vec<Tok>> {
    const OPS: [&str; 16] =
        ["&&", "||", "==", "!=", "<=", ">=", "<", ">", "!", "+", "-", "*", "/", "(", ")", ","];
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    'outer: while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < bytes.len() {
                let d = bytes[i] as char;
                let exp_sign = (d == '+' || d == '-') && matches!(bytes[i - 1], b'e' | b'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exp_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            let text = &input[start..i];
            let n = text
                .parse::<f64>()
                .map_err(|_| Error::Selection(format!("'{input}': bad number '{text}'")))?;
            out.push(Tok::Num(n));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(Tok::Ident(input[start..i].to_string()));
            continue;
        }
        for op in OPS {
            if input[i..].starts_with(op) {
                out.push(match op {
                    "(" => Tok::LParen,
                    ")" => Tok::RParen,
                    "," => Tok::Comma,
                    _ => Tok::Op(op),
                });
                i += op.len();
                continue 'outer;
            }
        }
        return Err(Error::Selection(format!("'{input}': unexpected character '{c}'")));
    }
    Ok(out)
}

struct CutParser<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl CutParser<'_> {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Tok::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, want: Tok) -> Result<()> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            other => Err(Error::Selection(format!("expected {want:?}, got {other:?}"))),
        }
    }

    fn binary(&mut self, ops: &[(&str, Op)], next: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        let mut lhs = next(self)?;
        while let Some(op) = self.peek_op().and_then(|s| ops.iter().find(|(t, _)| *t == s)) {
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Node::Bin(op.1, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or_expr(&mut self) -> Result<Node> {
        self.binary(&[("||", Op::Or)], Self::and_expr)
    }

    fn and_expr(&mut self) -> Result<Node> {
        self.binary(&[("&&", Op::And)], Self::cmp_expr)
    }

    fn cmp_expr(&mut self) -> Result<Node> {
        let lhs = self.add_expr()?;
        let op = match self.peek_op() {
            Some("==") => Op::Eq,
            Some("!=") => Op::Ne,
            Some("<") => Op::Lt,
            Some("<=") => Op::Le,
            Some(">") => Op::Gt,
            Some(">=") => Op::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.add_expr()?;
        Ok(Node::Bin(op, Box::new(lhs), Box::new(rhs)))
    }

    fn add_expr(&mut self) -> Result<Node> {
        self.binary(&[("+", Op::Add), ("-", Op::Sub)], Self::mul_expr)
    }

    fn mul_expr(&mut self) -> Result<Node> {
        self.binary(&[("*", Op::Mul), ("/", Op::Div)], Self::unary)
    }

    fn unary(&mut self) -> Result<Node> {
        match self.peek_op() {
            Some("-") => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some("!") => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.unary()?)))
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(Node::Num(n)),
            Some(Tok::LParen) => {
                let e = self.or_expr()?;
                self.expect(Tok::RParen)?;
                Ok(e)
            }
            Some(Tok::Ident(name)) if self.tokens.get(self.pos) == Some(&Tok::LParen) => {
                self.pos += 1;
                let (func, arity) = Func::lookup(&name)
                    .ok_or_else(|| Error::Selection(format!("unknown function '{name}'")))?;
                let mut args = vec![self.or_expr()?];
                while self.tokens.get(self.pos) == Some(&Tok::Comma) {
                    self.pos += 1;
                    args.push(self.or_expr()?);
                }
                self.expect(Tok::RParen)?;
                if args.len() != arity {
                    return Err(Error::Selection(format!(
                        "'{name}' takes {arity} argument(s), got {}",
                        args.len()
                    )));
                }
                Ok(Node::Call(func, args))
            }
            Some(Tok::Ident(name)) => Var::lookup(&name)
                .map(Node::Var)
                .ok_or_else(|| Error::Selection(format!("unknown variable '{name}' (use pt, eta, phi)"))),
            other => Err(Error::Selection(format!("expected number, variable or '(', got {other:?}"))),
        }
    }
}
