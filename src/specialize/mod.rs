//! Specialization: rewrite kernel source for one backend.
//!
//! Kernel source is opaque text except for two forms:
//!
//! ```text
//! @kernel fn NAME(PARAMS) { BODY }    kernel definition
//! @PRIMITIVE(ARGS)                    primitive call site
//! ```
//!
//! Everything else is copied through byte for byte. The backend is
//! looked up once for the calling context; each call site is handed to
//! the [`Resolver`] and replaced by the rendered realization, and each
//! kernel definition is wrapped in the backend's parallel construct.
//! The output contains no backend-selection branching.

mod kernel;

use std::ops::Range;

use tracing::{debug, info};

use crate::backend::Backend;
use crate::diagnostic::Diagnostic;
use crate::emit::Expr;
use crate::error::ResolveError;
use crate::lexeme::Lexeme;
use crate::lexer::Lexer;
use crate::primitive::Primitive;
use crate::registry::BackendRegistry;
use crate::resolve::Resolver;
use crate::span::{Span, Spanned};

/// One resolved primitive call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSite {
    pub primitive: Primitive,
    pub span: Span,
    /// Enclosing kernel, if any.
    pub kernel: Option<String>,
    pub realization: Expr,
}

/// Kernel source specialized for a single backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Specialized {
    pub backend: Backend,
    pub context: String,
    pub text: String,
    pub kernels: Vec<String>,
    pub sites: Vec<ResolvedSite>,
}

impl Specialized {
    /// Content hash of the backend and the emitted text.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.backend.name().as_bytes());
        hasher.update(&[0]);
        hasher.update(self.text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Specialize `source` for the backend bound to `context`.
///
/// Either every call site resolves and the full text is returned, or
/// all collected diagnostics are.
pub fn specialize_source(
    source: &str,
    context: &str,
    registry: &BackendRegistry,
) -> Result<Specialized, Vec<Diagnostic>> {
    let resolver = Resolver::for_context(registry, context)
        .map_err(|e| vec![e.into_diagnostic(Span::dummy())])?;
    specialize_for(source, context, resolver)
}

/// Specialize `source` with an explicit resolver.
pub fn specialize_for(
    source: &str,
    context: &str,
    resolver: Resolver,
) -> Result<Specialized, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source, 0).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    let balance_errors = check_balance(&tokens);
    if !balance_errors.is_empty() {
        return Err(balance_errors);
    }

    let mut spec = Specializer {
        source,
        tokens: &tokens,
        resolver,
        sites: Vec::new(),
        kernels: Vec::new(),
        diagnostics: Vec::new(),
    };
    let last = tokens.len() - 1; // Eof
    let body = spec.rewrite(0..last, 0..source.len(), None);

    if !spec.diagnostics.is_empty() {
        return Err(spec.diagnostics);
    }

    let backend = resolver.backend();
    let mut text = String::with_capacity(body.len() + 64);
    if backend.is_cpu() && !spec.kernels.is_empty() {
        text.push_str(kernel::CPU_PRELUDE);
    }
    text.push_str(&body);

    info!(
        %backend,
        context,
        kernels = spec.kernels.len(),
        sites = spec.sites.len(),
        "specialized"
    );
    Ok(Specialized {
        backend,
        context: context.to_string(),
        text,
        kernels: spec.kernels,
        sites: spec.sites,
    })
}

struct Specializer<'a> {
    source: &'a str,
    tokens: &'a [Spanned<Lexeme>],
    resolver: Resolver,
    sites: Vec<ResolvedSite>,
    kernels: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Specializer<'a> {
    /// Rewrite tokens `toks`, covering source bytes `bytes`.
    fn rewrite(&mut self, toks: Range<usize>, bytes: Range<usize>, kernel: Option<&str>) -> String {
        let mut out = String::new();
        let mut cursor = bytes.start;
        let mut i = toks.start;
        while i < toks.end {
            if self.tokens[i].node != Lexeme::At {
                i += 1;
                continue;
            }
            let at = self.tokens[i].span;
            out.push_str(&self.source[cursor..at.start as usize]);
            match self.site(i, toks.end, kernel) {
                Some((text, next)) => {
                    out.push_str(&text);
                    cursor = self.tokens[next - 1].span.end as usize;
                    i = next;
                }
                None => {
                    // Error already recorded; keep the '@' so offsets stay sane.
                    cursor = at.start as usize;
                    i += 1;
                }
            }
        }
        out.push_str(&self.source[cursor..bytes.end]);
        out
    }

    /// Handle the `@` at token `at`. Returns the replacement text and the
    /// index of the first token after the construct.
    fn site(&mut self, at: usize, end: usize, kernel: Option<&str>) -> Option<(String, usize)> {
        let name = match self.tokens.get(at + 1).map(|t| &t.node) {
            Some(Lexeme::Ident(name)) if at + 1 < end => name.clone(),
            _ => {
                self.error(
                    "expected a primitive name after '@'".to_string(),
                    self.tokens[at].span,
                );
                return None;
            }
        };
        let head = self.tokens[at].span.merge(self.tokens[at + 1].span);

        if name == "kernel" {
            return self.kernel_def(at, end, kernel, head);
        }

        let primitive = match Primitive::from_name(&name) {
            Ok(p) => p,
            Err(e) => {
                self.diagnostics.push(e.into_diagnostic(head));
                return None;
            }
        };

        let open = at + 2;
        if open >= end || self.tokens[open].node != Lexeme::LParen {
            self.error(format!("expected '(' after '@{}'", name), head);
            return None;
        }
        let close = self.matching(open)?;
        let span = head.merge(self.tokens[close].span);

        if primitive.requires_kernel() && kernel.is_none() {
            self.diagnostics
                .push(ResolveError::OutsideKernel { primitive }.into_diagnostic(span));
            return Some((String::new(), close + 1));
        }

        let mut args = Vec::new();
        for (n, arg) in self.split_args(open + 1, close).into_iter().enumerate() {
            let expr = if primitive == Primitive::SharedMem && n == 1 {
                self.shape_arg(arg, kernel)
            } else {
                Expr::raw(self.rewrite_arg(arg, kernel))
            };
            args.push(expr);
        }

        match self.resolver.resolve(primitive, args) {
            Ok(realization) => {
                let text = realization.to_string();
                self.sites.push(ResolvedSite {
                    primitive,
                    span,
                    kernel: kernel.map(str::to_string),
                    realization,
                });
                Some((text, close + 1))
            }
            Err(e) => {
                self.diagnostics.push(
                    e.into_diagnostic(span)
                        .with_note(format!("backend: {}", self.resolver.backend())),
                );
                Some((String::new(), close + 1))
            }
        }
    }

    /// `@kernel fn NAME(PARAMS) { BODY }`.
    fn kernel_def(
        &mut self,
        at: usize,
        end: usize,
        enclosing: Option<&str>,
        head: Span,
    ) -> Option<(String, usize)> {
        if let Some(outer) = enclosing {
            self.error(
                format!("kernel definitions cannot be nested (inside '{}')", outer),
                head,
            );
            return None;
        }

        let shape_error = |this: &mut Self| {
            this.error(
                "expected `fn NAME(PARAMS) { BODY }` after '@kernel'".to_string(),
                head,
            );
            this.skip_malformed_kernel(at, end)
        };

        let tokens = self.tokens;
        let is = |idx: usize, pred: &dyn Fn(&Lexeme) -> bool| idx < end && pred(&tokens[idx].node);
        if !is(at + 2, &|t| *t == Lexeme::Ident("fn".to_string())) {
            return shape_error(self);
        }
        let name = match self.tokens.get(at + 3).map(|t| &t.node) {
            Some(Lexeme::Ident(name)) if at + 3 < end => name.clone(),
            _ => return shape_error(self),
        };
        if !is(at + 4, &|t| *t == Lexeme::LParen) {
            return shape_error(self);
        }
        let params_close = self.matching(at + 4)?;
        if !is(params_close + 1, &|t| *t == Lexeme::LBrace) {
            return shape_error(self);
        }
        let body_open = params_close + 1;
        let body_close = self.matching(body_open)?;

        let params = self
            .rewrite(
                at + 5..params_close,
                self.inner_bytes(at + 4, params_close),
                None,
            )
            .trim()
            .to_string();
        let body = self.rewrite(
            body_open + 1..body_close,
            self.inner_bytes(body_open, body_close),
            Some(&name),
        );

        debug!(kernel = %name, backend = %self.resolver.backend(), "specialized kernel");
        let text = kernel::render(self.resolver.dispatch(), &name, &params, &body);
        self.kernels.push(name);
        Some((text, body_close + 1))
    }

    /// Skip from a malformed `@kernel` header to the end of the body it
    /// introduces, so primitives inside are not reported again as used
    /// outside a kernel. Stops at a `;` or at the end of the enclosing
    /// group when no body follows.
    fn skip_malformed_kernel(&self, at: usize, end: usize) -> Option<(String, usize)> {
        let mut depth = 0usize;
        let mut body_open = None;
        for i in at + 2..end {
            let tok = &self.tokens[i].node;
            if depth == 0 && *tok == Lexeme::LBrace {
                body_open = Some(i);
                break;
            }
            if depth == 0 && (tok.is_close() || *tok == Lexeme::Punct(';')) {
                return None;
            }
            if tok.is_open() {
                depth += 1;
            } else if tok.is_close() {
                depth -= 1;
            }
        }
        let body_open = body_open?;
        let mut depth = 0usize;
        for i in body_open..end {
            let tok = &self.tokens[i].node;
            if tok.is_open() {
                depth += 1;
            } else if tok.is_close() {
                depth -= 1;
                if depth == 0 {
                    let bytes = self.tokens[at].span.start as usize..self.tokens[i].span.end as usize;
                    return Some((self.source[bytes].to_string(), i + 1));
                }
            }
        }
        None
    }

    /// Source bytes strictly between two delimiter tokens.
    fn inner_bytes(&self, open: usize, close: usize) -> Range<usize> {
        self.tokens[open].span.end as usize..self.tokens[close].span.start as usize
    }

    /// Token ranges of the comma-separated arguments in `start..end`.
    /// A trailing comma does not start a new argument.
    fn split_args(&mut self, start: usize, end: usize) -> Vec<Range<usize>> {
        let mut args = Vec::new();
        if start == end {
            return args;
        }
        let mut depth = 0usize;
        let mut arg_start = start;
        for i in start..end {
            let tok = &self.tokens[i].node;
            if tok.is_open() {
                depth += 1;
            } else if tok.is_close() {
                depth = depth.saturating_sub(1);
            } else if *tok == Lexeme::Comma && depth == 0 {
                if arg_start == i {
                    self.error("empty argument".to_string(), self.tokens[i].span);
                }
                args.push(arg_start..i);
                arg_start = i + 1;
            }
        }
        if arg_start < end {
            args.push(arg_start..end);
        }
        args
    }

    fn rewrite_arg(&mut self, arg: Range<usize>, kernel: Option<&str>) -> String {
        let bytes =
            self.tokens[arg.start].span.start as usize..self.tokens[arg.end - 1].span.end as usize;
        self.rewrite(arg, bytes, kernel).trim().to_string()
    }

    /// A shape written as `(a, b)` or `[a, b]` becomes an array of
    /// extents; any other expression is a single extent.
    fn shape_arg(&mut self, arg: Range<usize>, kernel: Option<&str>) -> Expr {
        let first = &self.tokens[arg.start].node;
        if matches!(first, Lexeme::LParen | Lexeme::LBracket) {
            if let Some(close) = self.matching(arg.start) {
                if close == arg.end - 1 {
                    let dims = self
                        .split_args(arg.start + 1, close)
                        .into_iter()
                        .map(|d| Expr::raw(self.rewrite_arg(d, kernel)))
                        .collect();
                    return Expr::Array(dims);
                }
            }
        }
        Expr::raw(self.rewrite_arg(arg, kernel))
    }

    /// Index of the delimiter closing the one at `open`.
    fn matching(&mut self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            if tok.node.is_open() {
                depth += 1;
            } else if tok.node.is_close() {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        self.error("unclosed delimiter".to_string(), self.tokens[open].span);
        None
    }

    fn error(&mut self, message: String, span: Span) {
        self.diagnostics.push(Diagnostic::error(message, span));
    }
}

/// Every opening delimiter must be closed by its own kind.
fn check_balance(tokens: &[Spanned<Lexeme>]) -> Vec<Diagnostic> {
    let mut stack: Vec<&Spanned<Lexeme>> = Vec::new();
    let mut errors = Vec::new();
    for tok in tokens {
        if tok.node.is_open() {
            stack.push(tok);
        } else if tok.node.is_close() {
            match stack.pop() {
                Some(open) if open.node.closer().as_ref() == Some(&tok.node) => {}
                Some(open) => {
                    errors.push(
                        Diagnostic::error(format!("mismatched closing '{}'", tok.node), tok.span)
                            .with_note(format!("opened by '{}' here", open.node)),
                    );
                    return errors;
                }
                None => {
                    errors.push(Diagnostic::error(
                        format!("unexpected closing '{}'", tok.node),
                        tok.span,
                    ));
                    return errors;
                }
            }
        }
    }
    for open in stack {
        errors.push(Diagnostic::error(
            format!("unclosed '{}'", open.node),
            open.span,
        ));
    }
    errors
}
