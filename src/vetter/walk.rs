use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::lexer::lex;
use rustpython_parser::{Mode, StringKind, Tok};

use crate::vetter::policy::{root_module, Policy, FILE_OPEN};
use crate::vetter::{Violation, ViolationKind};

/// Source nesting deeper than this is rejected before it is parsed, CPython refuses similar depths.
pub const MAX_NESTING: usize = 200;

/// Hard limit on the recursion of the walker itself.
const MAX_WALK_DEPTH: usize = 500;

/// The byte offset of the first token where `source` nests deeper than [MAX_NESTING].
///
/// The depth is estimated from the tokens alone: brackets and indentation open a level, and operators
/// and keywords chain within the current bracket until a separator (`,` `=` `;` or a new line) starts
/// a sibling expression. Lexical errors end the scan, the parser reports them.
pub fn too_deep(source: &str) -> Option<usize> {
    too_deep_from(source, 0)
}

fn too_deep_from(source: &str, base: usize) -> Option<usize> {
    let mut indent: usize = 0;
    let mut outer: Vec<usize> = vec![];
    let mut chain = 0;

    for token in lex(source, Mode::Module) {
        let (tok, range) = match token {
            Ok(token) => token,
            Err(_) => return None,
        };
        let offset = u32::from(range.start()) as usize;

        match tok {
            Tok::Lpar | Tok::Lsqb | Tok::Lbrace => {
                outer.push(chain + 1);
                chain = 0;
            }
            Tok::Rpar | Tok::Rsqb | Tok::Rbrace => chain = outer.pop().unwrap_or(0),
            Tok::Indent => indent += 1,
            Tok::Dedent => indent = indent.saturating_sub(1),
            Tok::Comma | Tok::Equal | Tok::Semi | Tok::Newline => chain = 0,
            Tok::String {
                value,
                kind: StringKind::FString | StringKind::RawFString,
                ..
            } => {
                let depth = base + indent + outer.iter().sum::<usize>() + chain;
                if too_deep_from(&value, depth).is_some() {
                    return Some(offset);
                }
                continue;
            }
            Tok::Name { .. }
            | Tok::Int { .. }
            | Tok::Float { .. }
            | Tok::Complex { .. }
            | Tok::String { .. }
            | Tok::True
            | Tok::False
            | Tok::None
            | Tok::Ellipsis
            | Tok::NonLogicalNewline
            | Tok::StartModule
            | Tok::EndOfFile => continue,
            _ => chain += 1,
        }

        if base + indent + outer.iter().sum::<usize>() + chain > MAX_NESTING {
            return Some(offset);
        }
    }

    None
}

/// Check every node of `suite`, returning the violations grouped by check.
///
/// A suite nested deeper than the walker is willing to go yields a single syntax violation instead.
pub fn check_suite(policy: &Policy, source: &str, suite: &[ast::Stmt]) -> Vec<Violation> {
    let mut walker = Walker {
        policy,
        source,
        depth: 0,
        too_deep: None,
        imports: vec![],
        calls: vec![],
        attributes: vec![],
        operations: vec![],
    };
    walker.stmts(suite);

    let Walker {
        too_deep,
        mut imports,
        calls,
        attributes,
        operations,
        ..
    } = walker;

    if let Some(violation) = too_deep {
        return vec![violation];
    }
    imports.extend(calls);
    imports.extend(attributes);
    imports.extend(operations);
    imports
}

/// The 1-based line containing byte `offset`.
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

struct Walker<'a> {
    policy: &'a Policy,
    source: &'a str,

    depth: usize,
    too_deep: Option<Violation>,

    imports: Vec<Violation>,
    calls: Vec<Violation>,
    attributes: Vec<Violation>,
    operations: Vec<Violation>,
}

impl Walker<'_> {
    fn violation(&self, kind: ViolationKind, message: String, node: &impl Ranged) -> Violation {
        let line = line_of(self.source, u32::from(node.start()) as usize);
        let snippet = self.source.lines().nth(line - 1).unwrap_or("").trim().to_owned();
        Violation {
            kind,
            message,
            line: Some(line),
            snippet: Some(snippet),
        }
    }

    /// Track entering a node, returns false once the walk is too deep to continue.
    fn enter(&mut self, node: &impl Ranged) -> bool {
        self.depth += 1;
        if self.depth <= MAX_WALK_DEPTH {
            return true;
        }
        if self.too_deep.is_none() {
            let message = "Invalid Python syntax: code is nested too deeply".to_owned();
            self.too_deep = Some(self.violation(ViolationKind::SyntaxError, message, node));
        }
        false
    }

    fn check_import(&mut self, stmt: &ast::Stmt, module: &str, from: bool) {
        let root = root_module(module);
        let verb = if from { "Import from" } else { "Import of" };

        if self.policy.is_dangerous_module(root) {
            let message = format!("{} dangerous module '{}' is not allowed", verb, module);
            let v = self.violation(ViolationKind::DangerousImport, message, stmt);
            self.imports.push(v);
        } else if !self.policy.is_allowed_module(root) {
            let message = format!(
                "{} module '{}' is not in the allowed list. Allowed modules: {}",
                verb,
                module,
                self.policy.allowed_list()
            );
            let v = self.violation(ViolationKind::DisallowedImport, message, stmt);
            self.imports.push(v);
        }
    }

    fn stmts(&mut self, stmts: &[ast::Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &ast::Stmt) {
        if self.enter(stmt) {
            self.visit_stmt(stmt);
        }
        self.depth -= 1;
    }

    fn visit_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::FunctionDef(s) => {
                self.exprs(&s.decorator_list);
                self.arguments(&s.args);
                self.opt_expr(s.returns.as_deref());
                self.stmts(&s.body);
            }
            ast::Stmt::AsyncFunctionDef(s) => {
                self.exprs(&s.decorator_list);
                self.arguments(&s.args);
                self.opt_expr(s.returns.as_deref());
                self.stmts(&s.body);
            }
            ast::Stmt::ClassDef(s) => {
                self.exprs(&s.decorator_list);
                self.exprs(&s.bases);
                for keyword in &s.keywords {
                    self.expr(&keyword.value);
                }
                self.stmts(&s.body);
            }
            ast::Stmt::Return(s) => self.opt_expr(s.value.as_deref()),
            ast::Stmt::Delete(s) => {
                let v = self.violation(
                    ViolationKind::DangerousOperation,
                    "Delete operations are not allowed".to_owned(),
                    stmt,
                );
                self.operations.push(v);
                self.exprs(&s.targets);
            }
            ast::Stmt::Assign(s) => {
                self.exprs(&s.targets);
                self.expr(&s.value);
            }
            ast::Stmt::TypeAlias(s) => {
                self.expr(&s.name);
                self.expr(&s.value);
            }
            ast::Stmt::AugAssign(s) => {
                self.expr(&s.target);
                self.expr(&s.value);
            }
            ast::Stmt::AnnAssign(s) => {
                self.expr(&s.target);
                self.expr(&s.annotation);
                self.opt_expr(s.value.as_deref());
            }
            ast::Stmt::For(s) => {
                self.expr(&s.target);
                self.expr(&s.iter);
                self.stmts(&s.body);
                self.stmts(&s.orelse);
            }
            ast::Stmt::AsyncFor(s) => {
                self.expr(&s.target);
                self.expr(&s.iter);
                self.stmts(&s.body);
                self.stmts(&s.orelse);
            }
            ast::Stmt::While(s) => {
                self.expr(&s.test);
                self.stmts(&s.body);
                self.stmts(&s.orelse);
            }
            ast::Stmt::If(s) => {
                self.expr(&s.test);
                self.stmts(&s.body);
                self.stmts(&s.orelse);
            }
            ast::Stmt::With(s) => {
                self.with_items(&s.items);
                self.stmts(&s.body);
            }
            ast::Stmt::AsyncWith(s) => {
                self.with_items(&s.items);
                self.stmts(&s.body);
            }
            ast::Stmt::Match(s) => {
                self.expr(&s.subject);
                for case in &s.cases {
                    self.pattern(&case.pattern);
                    self.opt_expr(case.guard.as_deref());
                    self.stmts(&case.body);
                }
            }
            ast::Stmt::Raise(s) => {
                self.opt_expr(s.exc.as_deref());
                self.opt_expr(s.cause.as_deref());
            }
            ast::Stmt::Try(s) => {
                self.stmts(&s.body);
                self.handlers(&s.handlers);
                self.stmts(&s.orelse);
                self.stmts(&s.finalbody);
            }
            ast::Stmt::TryStar(s) => {
                self.stmts(&s.body);
                self.handlers(&s.handlers);
                self.stmts(&s.orelse);
                self.stmts(&s.finalbody);
            }
            ast::Stmt::Assert(s) => {
                self.expr(&s.test);
                self.opt_expr(s.msg.as_deref());
            }
            ast::Stmt::Import(s) => {
                for alias in &s.names {
                    self.check_import(stmt, alias.name.as_str(), false);
                }
            }
            ast::Stmt::ImportFrom(s) => {
                // relative imports without a module name only reach the bot's own package
                if let Some(module) = &s.module {
                    self.check_import(stmt, module.as_str(), true);
                }
            }
            ast::Stmt::Expr(s) => self.expr(&s.value),
            ast::Stmt::Global(_)
            | ast::Stmt::Nonlocal(_)
            | ast::Stmt::Pass(_)
            | ast::Stmt::Break(_)
            | ast::Stmt::Continue(_) => {}
        }
    }

    fn handlers(&mut self, handlers: &[ast::ExceptHandler]) {
        for handler in handlers {
            let ast::ExceptHandler::ExceptHandler(handler) = handler;
            self.opt_expr(handler.type_.as_deref());
            self.stmts(&handler.body);
        }
    }

    fn with_items(&mut self, items: &[ast::WithItem]) {
        for item in items {
            self.expr(&item.context_expr);
            self.opt_expr(item.optional_vars.as_deref());
        }
    }

    fn arguments(&mut self, args: &ast::Arguments) {
        let all = args.posonlyargs.iter().chain(&args.args).chain(&args.kwonlyargs);
        for arg in all {
            self.opt_expr(arg.def.annotation.as_deref());
            self.opt_expr(arg.default.as_deref());
        }
        for arg in args.vararg.iter().chain(&args.kwarg) {
            self.opt_expr(arg.annotation.as_deref());
        }
    }

    fn comprehensions(&mut self, generators: &[ast::Comprehension]) {
        for generator in generators {
            self.expr(&generator.target);
            self.expr(&generator.iter);
            self.exprs(&generator.ifs);
        }
    }

    fn pattern(&mut self, pattern: &ast::Pattern) {
        match pattern {
            ast::Pattern::MatchValue(p) => self.expr(&p.value),
            ast::Pattern::MatchSequence(p) => self.patterns(&p.patterns),
            ast::Pattern::MatchMapping(p) => {
                self.exprs(&p.keys);
                self.patterns(&p.patterns);
            }
            ast::Pattern::MatchClass(p) => {
                self.expr(&p.cls);
                self.patterns(&p.patterns);
                self.patterns(&p.kwd_patterns);
            }
            ast::Pattern::MatchAs(p) => {
                if let Some(inner) = &p.pattern {
                    self.pattern(inner);
                }
            }
            ast::Pattern::MatchOr(p) => self.patterns(&p.patterns),
            ast::Pattern::MatchSingleton(_) | ast::Pattern::MatchStar(_) => {}
        }
    }

    fn patterns(&mut self, patterns: &[ast::Pattern]) {
        for pattern in patterns {
            self.pattern(pattern);
        }
    }

    fn exprs(&mut self, exprs: &[ast::Expr]) {
        for expr in exprs {
            self.expr(expr);
        }
    }

    fn opt_expr(&mut self, expr: Option<&ast::Expr>) {
        if let Some(expr) = expr {
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &ast::Expr) {
        if self.enter(expr) {
            self.visit_expr(expr);
        }
        self.depth -= 1;
    }

    fn visit_expr(&mut self, expr: &ast::Expr) {
        match expr {
            ast::Expr::Call(e) => {
                if let ast::Expr::Name(name) = e.func.as_ref() {
                    let id = name.id.as_str();
                    if self.policy.is_dangerous_builtin(id) {
                        let message = format!("Call to dangerous built-in function '{}' is not allowed", id);
                        let v = self.violation(ViolationKind::DangerousFunction, message, expr);
                        self.calls.push(v);
                    }
                    if id == FILE_OPEN {
                        let message = "File operations are not allowed in bot code".to_owned();
                        let v = self.violation(ViolationKind::FileOperation, message, expr);
                        self.operations.push(v);
                    }
                }
                self.expr(&e.func);
                self.exprs(&e.args);
                for keyword in &e.keywords {
                    self.expr(&keyword.value);
                }
            }
            ast::Expr::Attribute(e) => {
                if self.policy.is_dangerous_attribute(e.attr.as_str()) {
                    let message = format!("Access to dangerous attribute '{}' is not allowed", e.attr);
                    let v = self.violation(ViolationKind::DangerousAttribute, message, expr);
                    self.attributes.push(v);
                }
                self.expr(&e.value);
            }
            ast::Expr::BoolOp(e) => self.exprs(&e.values),
            ast::Expr::NamedExpr(e) => {
                self.expr(&e.target);
                self.expr(&e.value);
            }
            ast::Expr::BinOp(e) => {
                self.expr(&e.left);
                self.expr(&e.right);
            }
            ast::Expr::UnaryOp(e) => self.expr(&e.operand),
            ast::Expr::Lambda(e) => {
                self.arguments(&e.args);
                self.expr(&e.body);
            }
            ast::Expr::IfExp(e) => {
                self.expr(&e.test);
                self.expr(&e.body);
                self.expr(&e.orelse);
            }
            ast::Expr::Dict(e) => {
                for key in e.keys.iter().flatten() {
                    self.expr(key);
                }
                self.exprs(&e.values);
            }
            ast::Expr::Set(e) => self.exprs(&e.elts),
            ast::Expr::ListComp(e) => {
                self.expr(&e.elt);
                self.comprehensions(&e.generators);
            }
            ast::Expr::SetComp(e) => {
                self.expr(&e.elt);
                self.comprehensions(&e.generators);
            }
            ast::Expr::GeneratorExp(e) => {
                self.expr(&e.elt);
                self.comprehensions(&e.generators);
            }
            ast::Expr::DictComp(e) => {
                self.expr(&e.key);
                self.expr(&e.value);
                self.comprehensions(&e.generators);
            }
            ast::Expr::Await(e) => self.expr(&e.value),
            ast::Expr::Yield(e) => self.opt_expr(e.value.as_deref()),
            ast::Expr::YieldFrom(e) => self.expr(&e.value),
            ast::Expr::Compare(e) => {
                self.expr(&e.left);
                self.exprs(&e.comparators);
            }
            ast::Expr::FormattedValue(e) => {
                self.expr(&e.value);
                self.opt_expr(e.format_spec.as_deref());
            }
            ast::Expr::JoinedStr(e) => self.exprs(&e.values),
            ast::Expr::Subscript(e) => {
                self.expr(&e.value);
                self.expr(&e.slice);
            }
            ast::Expr::Starred(e) => self.expr(&e.value),
            ast::Expr::List(e) => self.exprs(&e.elts),
            ast::Expr::Tuple(e) => self.exprs(&e.elts),
            ast::Expr::Slice(e) => {
                self.opt_expr(e.lower.as_deref());
                self.opt_expr(e.upper.as_deref());
                self.opt_expr(e.step.as_deref());
            }
            ast::Expr::Constant(_) | ast::Expr::Name(_) => {}
        }
    }
}
