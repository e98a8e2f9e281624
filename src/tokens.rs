//! Flattening the program tree into tagged tokens, resolving type tokens to
//! keywords, and a minimal layout for printing.

use std::borrow::Cow;

use crate::ast::{Decl, Expr, Function, Instr, LValue, LoopDir, LoopTest, Program};
use crate::semantics::{Type, ARRAY_SLOT};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Keywords, punctuation, operators and identifiers
    Text(Cow<'static, str>),
    Int(u64),
    /// Resolved to its keyword by `stringify_types`
    Type(Type),
}

impl Token {
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Text(t) => Some(t),
            _ => None,
        }
    }
}

fn kw(s: &'static str) -> Token {
    Token::Text(Cow::Borrowed(s))
}

fn ident(s: &str) -> Token {
    Token::Text(Cow::Owned(s.to_string()))
}

pub fn linearize_program(program: &Program) -> Vec<Token> {
    let mut out = vec![];
    for f in &program.functions {
        Linearizer { out: &mut out }.function(f);
    }
    out
}

pub fn linearize_function(function: &Function) -> Vec<Token> {
    let mut out = vec![];
    Linearizer { out: &mut out }.function(function);
    out
}

struct Linearizer<'a> {
    out: &'a mut Vec<Token>,
}

impl<'a> Linearizer<'a> {
    fn push(&mut self, t: Token) {
        self.out.push(t);
    }

    fn function(&mut self, f: &Function) {
        self.push(kw(f.call_conv.keyword()));
        self.push(kw("fn"));
        self.push(ident(&f.name));
        self.push(kw("("));
        for (i, p) in f.params.iter().enumerate() {
            if i > 0 {
                self.push(kw(","));
            }
            self.push(kw(p.storage.keyword()));
            self.push(Token::Type(p.ty));
            self.push(ident(&p.name));
        }
        self.push(kw(")"));
        if let Some((storage, ty)) = f.returns {
            self.push(kw("->"));
            self.push(kw(storage.keyword()));
            self.push(Token::Type(ty));
        }
        self.push(kw("{"));
        for d in &f.decls {
            self.decl(d);
        }
        for i in &f.body {
            self.instr(i);
        }
        if let Some(ret) = &f.ret {
            self.push(kw("return"));
            self.push(ident(ret));
            self.push(kw(";"));
        }
        self.push(kw("}"));
    }

    fn decl(&mut self, d: &Decl) {
        self.push(kw(d.storage.keyword()));
        self.push(Token::Type(d.ty));
        self.push(ident(&d.name));
        self.push(kw(";"));
    }

    fn block(&mut self, instrs: &[Instr]) {
        self.push(kw("{"));
        for i in instrs {
            self.instr(i);
        }
        self.push(kw("}"));
    }

    fn instr(&mut self, i: &Instr) {
        match i {
            Instr::Assign { target, op, value } => {
                self.lvalue(target);
                self.push(kw(op.symbol()));
                self.expr(value);
                self.push(kw(";"));
            }
            Instr::Flags { targets, lhs, rhs } => {
                for (n, t) in targets.iter().enumerate() {
                    if n > 0 {
                        self.push(kw(","));
                    }
                    match t {
                        Some(name) => self.push(ident(name)),
                        None => self.push(kw("_")),
                    }
                }
                self.push(kw("="));
                self.push(kw("#CMP"));
                self.push(kw("("));
                self.expr(lhs);
                self.push(kw(","));
                self.expr(rhs);
                self.push(kw(")"));
                self.push(kw(";"));
            }
            Instr::If { cond, then, otherwise } => {
                self.push(kw("if"));
                self.expr(cond);
                self.block(then);
                if let Some(otherwise) = otherwise {
                    self.push(kw("else"));
                    self.block(otherwise);
                }
            }
            Instr::For { var, start, dir, end, body } => {
                self.push(kw("for"));
                self.push(ident(var));
                self.push(kw("="));
                self.expr(start);
                self.push(kw(match dir {
                    LoopDir::To => "to",
                    LoopDir::Downto => "downto",
                }));
                self.expr(end);
                self.block(body);
            }
            Instr::While { test, cond, body } => {
                self.push(kw("while"));
                if *test == LoopTest::Post {
                    self.block(body);
                }
                self.push(kw("("));
                self.expr(cond);
                self.push(kw(")"));
                if *test == LoopTest::Pre {
                    self.block(body);
                }
            }
            Instr::Call { result, function, args } => {
                if let Some(result) = result {
                    self.lvalue(result);
                    self.push(kw("="));
                }
                self.push(ident(function));
                self.push(kw("("));
                for (n, a) in args.iter().enumerate() {
                    if n > 0 {
                        self.push(kw(","));
                    }
                    self.expr(a);
                }
                self.push(kw(")"));
                self.push(kw(";"));
            }
        }
    }

    fn lvalue(&mut self, l: &LValue) {
        match l {
            LValue::Var(n) => self.push(ident(n)),
            LValue::Slot(n) => self.slot(n),
        }
    }

    fn slot(&mut self, name: &str) {
        self.push(ident(name));
        self.push(kw("["));
        self.push(Token::Int(ARRAY_SLOT));
        self.push(kw("]"));
    }

    fn expr(&mut self, e: &Expr) {
        match e {
            Expr::Bool(b) => self.push(kw(if *b { "true" } else { "false" })),
            Expr::Int(n) => self.push(Token::Int(*n)),
            Expr::Var(n) => self.push(ident(n)),
            Expr::Slot(n) => self.slot(n),
            Expr::Unary(op, e) => {
                self.push(kw("("));
                self.push(kw(op.symbol()));
                self.expr(e);
                self.push(kw(")"));
            }
            Expr::Binary(l, op, r) => {
                self.push(kw("("));
                self.expr(l);
                self.push(kw(op.symbol()));
                self.expr(r);
                self.push(kw(")"));
            }
            Expr::Paren(e) => {
                self.push(kw("("));
                self.expr(e);
                self.push(kw(")"));
            }
        }
    }
}

/// Replaces every `Type` token with its keyword.
pub fn stringify_types(tokens: &mut [Token]) {
    for t in tokens.iter_mut() {
        if let Token::Type(ty) = *t {
            *t = Token::Text(Cow::Owned(ty.to_string()));
        }
    }
}

const KEYWORDS: &[&str] = &[
    "export", "inline", "fn", "reg", "stack", "if", "else", "for", "to", "downto", "while", "return",
    "true", "false",
];

fn is_callee(t: &Token) -> bool {
    match t {
        Token::Text(s) => {
            let s: &str = s;
            s == "#CMP"
                || (!KEYWORDS.contains(&s) && s.chars().next().map_or(false, |c| c.is_ascii_alphabetic()))
        }
        _ => false,
    }
}

/// Lays tokens out one statement per line with four-space indentation.
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut indent = 0usize;
    let mut line_start = true;
    let mut prev: Option<&Token> = None;
    let mut parens = 0usize;
    // paren depth at which a post-test condition started
    let mut trailing_cond: Option<usize> = None;

    for (i, t) in tokens.iter().enumerate() {
        let text: Cow<str> = match t {
            Token::Text(s) => Cow::Borrowed(&**s),
            Token::Int(n) => Cow::Owned(n.to_string()),
            Token::Type(ty) => Cow::Owned(ty.to_string()),
        };
        let next = tokens.get(i + 1).and_then(Token::text);

        if text == "}" {
            indent = indent.saturating_sub(1);
            if !line_start {
                out.push('\n');
                line_start = true;
            }
        }

        if line_start {
            out.push_str(&"    ".repeat(indent));
        } else {
            let glue = matches!(&*text, ";" | "," | ")" | "]" | "[")
                || matches!(prev.and_then(Token::text), Some("(") | Some("["))
                || (text == "(" && prev.map_or(false, is_callee));
            if !glue {
                out.push(' ');
            }
        }
        out.push_str(&text);
        line_start = false;

        match &*text {
            "(" => {
                if prev.and_then(Token::text) == Some("}") {
                    trailing_cond = Some(parens);
                }
                parens += 1;
            }
            ")" => {
                parens = parens.saturating_sub(1);
                if trailing_cond == Some(parens) {
                    trailing_cond = None;
                    out.push('\n');
                    line_start = true;
                }
            }
            "{" => {
                indent += 1;
                out.push('\n');
                line_start = true;
            }
            ";" => {
                out.push('\n');
                line_start = true;
            }
            "}" if next != Some("else") && next != Some("(") => {
                out.push('\n');
                if indent == 0 {
                    out.push('\n');
                }
                line_start = true;
            }
            _ => {}
        }
        prev = Some(t);
    }
    out
}
