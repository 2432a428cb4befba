// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Single-pass brace-balanced scope tracking.
//!
//! Walks a Zig source buffer once, line by line, against the code-only
//! view provided by [`SourceContext`] and builds a [`ScopeTree`]:
//! function, test and control scopes, allocation-bearing variables with
//! allocator-origin attribution, defer/errdefer records, arena handles
//! and allocator aliases, return statements and `try` sites.
//!
//! The tracker is stateless between builds: every call to
//! [`ScopeTracker::build`] starts from a fresh tree, so reuse never
//! leaks state from a previous file. Malformed input degrades to
//! best-effort; the only hard error is exceeding the scope depth limit.

use masterror::AppResult;
use tracing::{debug, trace};

use crate::{
    config::{Config, OwnershipPattern},
    error::MaxDepthExceededError,
    patterns::PatternMatcher,
    scope::{
        AllocKind, ArenaAlias, DeferRecord, FieldAssign, Parameter, ReturnRecord, Scope,
        ScopeTree, ScopeType, Variable
    },
    source_context::SourceContext
};

/// Allocation-call markers searched for in declaration initializers.
const ALLOC_MARKERS: [(&str, AllocKind); 8] = [
    (".alloc(", AllocKind::Alloc),
    (".create(", AllocKind::Create),
    (".dupe(", AllocKind::Dupe),
    (".dupeZ(", AllocKind::Dupe),
    (".allocPrint(", AllocKind::AllocPrint),
    (".allocSentinel(", AllocKind::AllocSentinel),
    (".realloc(", AllocKind::Realloc),
    ("ArenaAllocator.init(", AllocKind::ArenaInit),
];

/// Origin reported for allocations drawn from a function parameter.
///
/// # Arguments
///
/// * `name` - Parameter name
pub fn parameter_origin(name: &str) -> String {
    format!("<parameter:{}>", name)
}

/// Builder for [`ScopeTracker`].
///
/// # Examples
///
/// ```
/// use zigcheck::scope_tracker::ScopeTracker;
///
/// let tracker = ScopeTracker::builder().max_scope_depth(16).build();
/// let _ = tracker;
/// ```
#[derive(Debug)]
pub struct ScopeTrackerBuilder {
    max_scope_depth:           usize,
    track_arena_allocators:    bool,
    track_defer_statements:    bool,
    track_variable_lifecycles: bool,
    ownership_patterns:        Vec<OwnershipPattern>,
    matcher:                   PatternMatcher
}

impl Default for ScopeTrackerBuilder {
    fn default() -> Self {
        Self {
            max_scope_depth:           64,
            track_arena_allocators:    true,
            track_defer_statements:    true,
            track_variable_lifecycles: true,
            ownership_patterns:        crate::config::default_ownership_patterns(),
            matcher:                   PatternMatcher::default()
        }
    }
}

impl ScopeTrackerBuilder {
    /// Scope nesting limit; opening a scope at this depth fails.
    pub fn max_scope_depth(mut self, depth: usize) -> Self {
        self.max_scope_depth = depth;
        self
    }

    /// Track arena handles and allocator aliases.
    pub fn track_arena_allocators(mut self, track: bool) -> Self {
        self.track_arena_allocators = track;
        self
    }

    /// Track defer and errdefer statements.
    pub fn track_defer_statements(mut self, track: bool) -> Self {
        self.track_defer_statements = track;
        self
    }

    /// Track allocation-bearing variable declarations.
    pub fn track_variable_lifecycles(mut self, track: bool) -> Self {
        self.track_variable_lifecycles = track;
        self
    }

    /// Ownership-transfer rules carried for the analyzers.
    pub fn ownership_patterns(mut self, patterns: Vec<OwnershipPattern>) -> Self {
        self.ownership_patterns = patterns;
        self
    }

    /// Allocator attribution table.
    pub fn matcher(mut self, matcher: PatternMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Finish the builder.
    pub fn build(self) -> ScopeTracker {
        ScopeTracker {
            max_scope_depth:           self.max_scope_depth,
            track_arena_allocators:    self.track_arena_allocators,
            track_defer_statements:    self.track_defer_statements,
            track_variable_lifecycles: self.track_variable_lifecycles,
            ownership_patterns:        self.ownership_patterns,
            matcher:                   self.matcher
        }
    }
}

/// Single-pass scope tracker.
///
/// # Examples
///
/// ```
/// use zigcheck::{scope_tracker::ScopeTracker, source_context::SourceContext};
///
/// let source = "fn main() void {\n}\n";
/// let ctx = SourceContext::new(source);
/// let tree = ScopeTracker::new().build(source, &ctx).unwrap();
/// assert_eq!(tree.scopes().len(), 1);
/// assert_eq!(tree.scopes()[0].name, "main");
/// ```
#[derive(Debug)]
pub struct ScopeTracker {
    max_scope_depth:           usize,
    track_arena_allocators:    bool,
    track_defer_statements:    bool,
    track_variable_lifecycles: bool,
    ownership_patterns:        Vec<OwnershipPattern>,
    matcher:                   PatternMatcher
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope opener carried across lines while its head is incomplete.
#[derive(Debug)]
enum PendingOpener {
    /// Function signature accumulating until its opening brace
    Function { buffer: String },
    /// Control or test scope whose brace has not been seen yet
    Scope { scope_type: ScopeType, name: String }
}

/// Statement spilling over the end of a line.
#[derive(Debug)]
struct PendingStmt {
    paren_depth: i32,
    brace_depth: i32,
    start_line:  usize,
    opener:      Option<PendingOpener>
}

/// Origin alias: a plain binding that names a known allocator.
#[derive(Debug)]
struct OriginAlias {
    name:   String,
    origin: String,
    scope:  Option<usize>
}

struct BuildState {
    tree:           ScopeTree,
    stack:          Vec<usize>,
    pending:        Option<PendingStmt>,
    origin_aliases: Vec<OriginAlias>,
    /// Block-bodied `defer { ... }` scopes still open, with their
    /// errdefer flag.
    defer_blocks:   Vec<(usize, bool)>
}

impl ScopeTracker {
    /// Tracker with default options and the built-in pattern table.
    pub fn new() -> Self {
        ScopeTrackerBuilder::default().build()
    }

    /// Start building a tracker.
    pub fn builder() -> ScopeTrackerBuilder {
        ScopeTrackerBuilder::default()
    }

    /// Tracker configured from an effective configuration.
    ///
    /// Compiles the allocator pattern table, so configuration errors
    /// (`EmptyPatternName`, `EmptyPattern`, `DuplicatePatternName`)
    /// surface here, before any analysis.
    ///
    /// # Arguments
    ///
    /// * `config` - Effective configuration
    ///
    /// # Returns
    ///
    /// `AppResult<ScopeTracker>` - Configured tracker or error
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let matcher = PatternMatcher::compile(
            &config.patterns.patterns,
            &config.patterns.disabled_defaults,
            config.patterns.use_defaults
        )?;

        Ok(Self::builder()
            .max_scope_depth(config.options.max_scope_depth)
            .track_arena_allocators(config.options.track_arena_allocators)
            .track_defer_statements(config.options.track_defer_statements)
            .track_variable_lifecycles(config.options.track_variable_lifecycles)
            .ownership_patterns(config.memory.ownership_patterns.clone())
            .matcher(matcher)
            .build())
    }

    /// Ownership rules this tracker was configured with.
    pub fn ownership_patterns(&self) -> &[OwnershipPattern] {
        &self.ownership_patterns
    }

    /// Allocator pattern table this tracker was configured with.
    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Build the scope tree for a source buffer.
    ///
    /// Never fails on malformed input: unbalanced braces close at EOF,
    /// malformed signatures are recorded best-effort. The only error is
    /// `MaxDepthExceeded` when nesting reaches the configured limit.
    ///
    /// # Arguments
    ///
    /// * `source` - Raw source text
    /// * `ctx` - Classification of the same buffer
    ///
    /// # Returns
    ///
    /// `AppResult<ScopeTree>` - Completed scope tree or depth error
    pub fn build(&self, source: &str, ctx: &SourceContext) -> AppResult<ScopeTree> {
        let mut state = BuildState {
            tree:           ScopeTree::new(),
            stack:          Vec::new(),
            pending:        None,
            origin_aliases: Vec::new(),
            defer_blocks:   Vec::new()
        };

        let mut line_count = 0;
        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = idx + 1;
            line_count = line_no;
            let view = ctx.code_view(line_no, raw_line);
            self.walk_line(&mut state, ctx, line_no, raw_line, &view)?;
        }

        let last_line = line_count.max(1);
        while let Some(open) = state.stack.pop() {
            let scope = &mut state.tree.scopes_mut()[open];
            scope.end_line = Some(last_line);
            scope.byte_end = Some(ctx.source_len());
        }

        debug!(
            scopes = state.tree.scopes().len(),
            lines = last_line,
            "scope tracking complete"
        );
        Ok(state.tree)
    }

    fn walk_line(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        raw_line: &str,
        view: &str
    ) -> AppResult<()> {
        let mut i = 0;

        if state.pending.is_some() {
            i = self.continue_pending(state, ctx, line_no, view)?;
            if state.pending.is_some() {
                return Ok(());
            }
        }

        let bytes = view.as_bytes();
        while i < bytes.len() {
            let b = bytes[i];
            if b == b' ' || b == b',' || b == b';' || b == b':' {
                i += 1;
                continue;
            }
            if b == b'}' {
                self.close_scope(state, ctx, line_no);
                i += 1;
                continue;
            }
            if b == b'{' {
                self.open_scope(state, ctx, ScopeType::AnonymousBlock, String::new(), line_no)?;
                i += 1;
                continue;
            }

            if is_ident_start(b) {
                let word = read_word(view, i);
                match word {
                    "pub" | "export" | "inline" | "noinline" | "extern" | "threadlocal" => {
                        i += word.len();
                    }
                    "fn" => {
                        i = self.handle_fn(state, ctx, line_no, view, i)?;
                    }
                    "test" => {
                        i = self.handle_test(state, ctx, line_no, raw_line, view, i)?;
                    }
                    "if" => {
                        i = self.handle_control(
                            state,
                            ctx,
                            line_no,
                            view,
                            i + word.len(),
                            ScopeType::IfBlock
                        )?;
                    }
                    "while" => {
                        i = self.handle_control(
                            state,
                            ctx,
                            line_no,
                            view,
                            i + word.len(),
                            ScopeType::WhileLoop
                        )?;
                    }
                    "for" => {
                        i = self.handle_control(
                            state,
                            ctx,
                            line_no,
                            view,
                            i + word.len(),
                            ScopeType::ForLoop
                        )?;
                    }
                    "switch" => {
                        i = self.handle_control(
                            state,
                            ctx,
                            line_no,
                            view,
                            i + word.len(),
                            ScopeType::SwitchBlock
                        )?;
                    }
                    "else" => {
                        i = self.handle_else(state, ctx, line_no, view, i + word.len())?;
                    }
                    "comptime" => {
                        let after = skip_spaces(view, i + word.len());
                        if bytes.get(after) == Some(&b'{') {
                            self.open_scope(
                                state,
                                ctx,
                                ScopeType::ComptimeBlock,
                                String::new(),
                                line_no
                            )?;
                            i = after + 1;
                        } else {
                            i += word.len();
                        }
                    }
                    "defer" | "errdefer" => {
                        i = self.handle_defer(
                            state,
                            ctx,
                            line_no,
                            view,
                            i + word.len(),
                            word == "errdefer"
                        )?;
                    }
                    "return" => {
                        i = self.handle_return(state, ctx, line_no, view, i + word.len())?;
                    }
                    "const" | "var" => {
                        i = self.handle_decl(state, ctx, line_no, view, i + word.len())?;
                    }
                    _ => {
                        // Labeled block?
                        let after = skip_spaces(view, i + word.len());
                        let next = skip_spaces(view, after + 1);
                        if bytes.get(after) == Some(&b':') && bytes.get(next) == Some(&b'{') {
                            self.open_scope(
                                state,
                                ctx,
                                ScopeType::Block,
                                word.to_string(),
                                line_no
                            )?;
                            i = next + 1;
                        } else {
                            i = self.handle_generic(state, ctx, line_no, view, i)?;
                        }
                    }
                }
            } else {
                i = self.handle_generic(state, ctx, line_no, view, i)?;
            }
        }

        Ok(())
    }

    /// Consume a continuation line of a pending statement or opener.
    ///
    /// Returns the position in `view` where normal processing resumes;
    /// the pending state stays set when the statement is still open at
    /// the end of the line.
    fn continue_pending(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str
    ) -> AppResult<usize> {
        let Some(mut pending) = state.pending.take() else {
            return Ok(0);
        };

        self.note_try(state, line_no, view);

        let bytes = view.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => pending.paren_depth += 1,
                b')' => pending.paren_depth -= 1,
                b'{' if pending.paren_depth <= 0 && pending.brace_depth == 0 => {
                    match pending.opener.take() {
                        Some(PendingOpener::Function {
                            mut buffer
                        }) => {
                            buffer.push(' ');
                            buffer.push_str(&view[..i]);
                            let (name, parameters, return_type) = parse_signature(&buffer);
                            self.open_function(
                                state,
                                ctx,
                                name,
                                parameters,
                                return_type,
                                pending.start_line
                            )?;
                            return Ok(i + 1);
                        }
                        Some(PendingOpener::Scope {
                            scope_type,
                            name
                        }) => {
                            self.open_scope_at(state, ctx, scope_type, name, pending.start_line)?;
                            return Ok(i + 1);
                        }
                        None => {
                            pending.brace_depth += 1;
                        }
                    }
                }
                b'{' => pending.brace_depth += 1,
                b'}' => {
                    if pending.brace_depth == 0 {
                        // Stray closer: the statement never completed.
                        return Ok(i);
                    }
                    pending.brace_depth -= 1;
                }
                b';' if pending.paren_depth <= 0 && pending.brace_depth == 0 => {
                    // Statement complete; a pending function head here
                    // was a prototype without a body.
                    return Ok(i + 1);
                }
                _ => {}
            }
            i += 1;
        }

        if let Some(PendingOpener::Function {
            buffer
        }) = &mut pending.opener
        {
            buffer.push(' ');
            buffer.push_str(view);
        }
        state.pending = Some(pending);
        Ok(view.len())
    }

    fn handle_fn(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        fn_at: usize
    ) -> AppResult<usize> {
        let bytes = view.as_bytes();
        let mut paren_depth: i32 = 0;
        let mut i = fn_at + 2;

        while i < bytes.len() {
            match bytes[i] {
                b'(' => paren_depth += 1,
                b')' => paren_depth -= 1,
                b'{' if paren_depth <= 0 => {
                    let (name, parameters, return_type) = parse_signature(&view[fn_at..i]);
                    self.open_function(state, ctx, name, parameters, return_type, line_no)?;
                    return Ok(i + 1);
                }
                b';' if paren_depth <= 0 => {
                    // Prototype or function-type value.
                    return Ok(i + 1);
                }
                _ => {}
            }
            i += 1;
        }

        state.pending = Some(PendingStmt {
            paren_depth,
            brace_depth: 0,
            start_line: line_no,
            opener: Some(PendingOpener::Function {
                buffer: view[fn_at..].to_string()
            })
        });
        Ok(view.len())
    }

    fn handle_test(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        raw_line: &str,
        view: &str,
        test_at: usize
    ) -> AppResult<usize> {
        // Positions are read from the raw line: the name literal is
        // blanked in the code view.
        let after = skip_spaces(raw_line, test_at + 4);
        let raw_bytes = raw_line.as_bytes();

        let (name, name_end) = if raw_bytes.get(after) == Some(&b'"') {
            parse_string_literal(raw_line, after)
        } else if after < raw_line.len() && is_ident_start(raw_bytes[after]) {
            let word = read_word(raw_line, after);
            (word.to_string(), after + word.len())
        } else {
            // `test {` style unnamed test block.
            (String::new(), after)
        };

        let brace = view[name_end..].find('{').map(|p| name_end + p);
        match brace {
            Some(at) => {
                self.open_scope_at(state, ctx, ScopeType::TestFunction, name, line_no)?;
                Ok(at + 1)
            }
            None => {
                state.pending = Some(PendingStmt {
                    paren_depth: 0,
                    brace_depth: 0,
                    start_line:  line_no,
                    opener:      Some(PendingOpener::Scope {
                        scope_type: ScopeType::TestFunction,
                        name
                    })
                });
                Ok(view.len())
            }
        }
    }

    fn handle_control(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        mut i: usize,
        scope_type: ScopeType
    ) -> AppResult<usize> {
        let bytes = view.as_bytes();
        let mut paren_depth: i32 = 0;
        let head_start = i;

        while i < bytes.len() {
            match bytes[i] {
                b'(' => paren_depth += 1,
                b')' => paren_depth -= 1,
                b'{' if paren_depth <= 0 => {
                    self.note_try(state, line_no, &view[head_start..i]);
                    self.open_scope(state, ctx, scope_type, String::new(), line_no)?;
                    return Ok(i + 1);
                }
                b';' if paren_depth <= 0 => {
                    // Braceless single-statement body already consumed.
                    self.note_try(state, line_no, &view[head_start..i]);
                    return Ok(i + 1);
                }
                b'a'..=b'z' if paren_depth <= 0 => {
                    // End of the control head: a braceless body starts
                    // with a keyword or identifier. Resume the normal
                    // walk there so `if (x) return y;` still records
                    // its statement.
                    if is_word_at(view, i)
                        && matches!(
                            read_word(view, i),
                            "return" | "const" | "var" | "defer" | "errdefer" | "try" | "break"
                                | "continue" | "unreachable" | "if" | "while" | "for" | "switch"
                        )
                    {
                        self.note_try(state, line_no, &view[head_start..i]);
                        return Ok(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        self.note_try(state, line_no, &view[head_start..]);
        state.pending = Some(PendingStmt {
            paren_depth,
            brace_depth: 0,
            start_line: line_no,
            opener: Some(PendingOpener::Scope {
                scope_type,
                name: String::new()
            })
        });
        Ok(view.len())
    }

    fn handle_else(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        i: usize
    ) -> AppResult<usize> {
        let mut after = skip_spaces(view, i);
        let bytes = view.as_bytes();

        if after < bytes.len() && is_ident_start(bytes[after]) && read_word(view, after) == "if" {
            return self.handle_control(state, ctx, line_no, view, after + 2, ScopeType::IfBlock);
        }

        // Error-union else with a capture: `else |err| { ... }`.
        if bytes.get(after) == Some(&b'|')
            && let Some(close) = view[after + 1..].find('|')
        {
            after = skip_spaces(view, after + 1 + close + 1);
        }

        if bytes.get(after) == Some(&b'{') {
            self.open_scope(state, ctx, ScopeType::ElseBlock, String::new(), line_no)?;
            return Ok(after + 1);
        }
        // Braceless else body; resume the normal walk.
        Ok(after)
    }

    fn handle_defer(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        i: usize,
        is_errdefer: bool
    ) -> AppResult<usize> {
        let (end, text, opened) = self.scan_statement(state, ctx, line_no, view, i, None)?;
        let text = text.trim().trim_end_matches(';').trim().to_string();

        self.note_try(state, line_no, &text);

        if !self.track_defer_statements {
            return Ok(end);
        }

        if opened && text.is_empty() {
            // Block-bodied `defer { ... }`: every statement inside the
            // block counts as cleanup text.
            if let Some(&block) = state.stack.last() {
                state.defer_blocks.push((block, is_errdefer));
            }
            return Ok(end);
        }

        if let Some(&current) = state.stack.last() {
            trace!(line = line_no, errdefer = is_errdefer, "defer statement");
            state.tree.scopes_mut()[current].defers.push(DeferRecord {
                line: line_no,
                is_errdefer,
                text: text.clone()
            });
            self.mark_defer_targets(state, line_no, &text, is_errdefer);
        }

        Ok(end)
    }

    /// Set defer flags on every visible variable named in `text`.
    ///
    /// Scope-bounded: only variables in the enclosing chain match.
    fn mark_defer_targets(
        &self,
        state: &mut BuildState,
        line_no: usize,
        text: &str,
        is_errdefer: bool
    ) {
        for &scope in state.stack.iter().rev() {
            for var in &mut state.tree.scopes_mut()[scope].variables {
                if contains_word(text, &var.name) {
                    if is_errdefer {
                        var.has_errdefer = true;
                    } else {
                        var.has_defer = true;
                    }
                    if var.defer_line.is_none() {
                        var.defer_line = Some(line_no);
                    }
                }
            }
        }
    }

    fn handle_return(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        i: usize
    ) -> AppResult<usize> {
        let (end, text, _opened) = self.scan_statement(state, ctx, line_no, view, i, None)?;
        let text = text.trim().trim_end_matches(';').trim().to_string();

        self.note_try(state, line_no, &text);

        if let Some(func) = self.enclosing_function(state) {
            state.tree.scopes_mut()[func].returns.push(ReturnRecord {
                line: line_no,
                text
            });
        }

        Ok(end)
    }

    fn handle_decl(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        i: usize
    ) -> AppResult<usize> {
        let name_at = skip_spaces(view, i);
        let bytes = view.as_bytes();
        if name_at >= bytes.len() || !is_ident_start(bytes[name_at]) {
            return self.handle_generic(state, ctx, line_no, view, name_at.min(view.len()));
        }
        let name = read_word(view, name_at).to_string();

        let (end, text, _opened) =
            self.scan_statement(state, ctx, line_no, view, name_at + name.len(), Some(&name))?;
        self.note_try(state, line_no, &text);

        let Some(eq) = find_assign(&text) else {
            return Ok(end);
        };
        let expr = text[eq + 1..].trim().trim_end_matches(';').trim();

        if state.stack.is_empty() {
            // Top-level declarations are comptime; only allocator
            // aliases are interesting there.
            self.record_alias(state, line_no, &name, expr, None);
            return Ok(end);
        }

        if !self.track_variable_lifecycles {
            return Ok(end);
        }

        match detect_allocation(expr) {
            Some((kind, marker_at)) => {
                self.record_variable(state, line_no, name_at, &name, expr, kind, marker_at);
            }
            None => {
                let scope = state.stack.last().copied();
                self.record_alias(state, line_no, &name, expr, scope);
            }
        }

        Ok(end)
    }

    fn handle_generic(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        i: usize
    ) -> AppResult<usize> {
        let (end, text, _opened) = self.scan_statement(state, ctx, line_no, view, i, None)?;
        self.note_try(state, line_no, &text);
        self.record_field_assign(state, line_no, &text);

        // Statements inside an open `defer { ... }` block act as
        // cleanup text for the visible variables they name.
        let active = state
            .defer_blocks
            .iter()
            .rev()
            .find(|(scope, _)| state.stack.contains(scope))
            .map(|&(scope, is_errdefer)| (scope, is_errdefer));
        if let Some((scope, is_errdefer)) = active {
            let cleaned = text.trim().trim_end_matches(';').trim().to_string();
            if !cleaned.is_empty() {
                state.tree.scopes_mut()[scope].defers.push(DeferRecord {
                    line:        line_no,
                    is_errdefer,
                    text:        cleaned.clone()
                });
                self.mark_defer_targets(state, line_no, &cleaned, is_errdefer);
            }
        }

        Ok(end)
    }

    /// Scan a statement from `start`, tracking nesting.
    ///
    /// Stops at a `;` at depth zero, at a `}` that belongs to an outer
    /// scope, or at a `{` that opens a real block (`=> {`, `catch {`,
    /// `orelse {`, container definitions); literal braces and
    /// parenthesized groups are skipped. Spills into the pending state
    /// when the line ends inside a group.
    ///
    /// # Returns
    ///
    /// (resume position, statement text, whether a scope was opened)
    fn scan_statement(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        line_no: usize,
        view: &str,
        start: usize,
        decl_name: Option<&str>
    ) -> AppResult<(usize, String, bool)> {
        let bytes = view.as_bytes();
        let mut paren_depth: i32 = 0;
        let mut brace_depth: i32 = 0;
        let mut i = start;

        while i < bytes.len() {
            match bytes[i] {
                b'(' => paren_depth += 1,
                b')' => {
                    if paren_depth == 0 {
                        return Ok((i, view[start..i].to_string(), false));
                    }
                    paren_depth -= 1;
                }
                b'{' if paren_depth == 0 && brace_depth == 0 => {
                    let before = &view[start..i];
                    if brace_opens_block(before) {
                        let (scope_type, name) = if is_container_opener(before) {
                            (
                                ScopeType::Block,
                                decl_name.map(str::to_string).unwrap_or_default()
                            )
                        } else {
                            (ScopeType::AnonymousBlock, String::new())
                        };
                        self.open_scope(state, ctx, scope_type, name, line_no)?;
                        return Ok((i + 1, before.to_string(), true));
                    }
                    brace_depth += 1;
                }
                b'{' => brace_depth += 1,
                b'}' => {
                    if brace_depth == 0 {
                        return Ok((i, view[start..i].to_string(), false));
                    }
                    brace_depth -= 1;
                }
                b';' if paren_depth == 0 && brace_depth == 0 => {
                    return Ok((i + 1, view[start..i].to_string(), false));
                }
                _ => {}
            }
            i += 1;
        }

        if paren_depth > 0 || brace_depth > 0 {
            state.pending = Some(PendingStmt {
                paren_depth,
                brace_depth,
                start_line: line_no,
                opener: None
            });
        }
        Ok((view.len(), view[start..].to_string(), false))
    }

    fn record_variable(
        &self,
        state: &mut BuildState,
        line_no: usize,
        name_at: usize,
        name: &str,
        expr: &str,
        kind: AllocKind,
        marker_at: usize
    ) {
        let Some(&current) = state.stack.last() else {
            return;
        };

        let (origin, arena_managed) = if kind == AllocKind::ArenaInit {
            ("ArenaAllocator".to_string(), false)
        } else {
            let receiver = clean_receiver(&expr[..marker_at]);
            self.resolve_origin(state, &receiver, expr, kind)
        };

        trace!(line = line_no, name, origin = %origin, "allocation recorded");
        state.tree.scopes_mut()[current].variables.push(Variable {
            name: name.to_string(),
            line: line_no,
            column: name_at + 1,
            origin,
            kind,
            arena_managed,
            has_defer: false,
            has_errdefer: false,
            defer_line: None,
            transferred: false
        });
    }

    /// Resolve an allocation receiver to an allocator origin.
    ///
    /// Resolution order: visible arena handle or alias, pattern table,
    /// function parameter, visible origin alias, unknown. `allocPrint`
    /// draws its allocator from the first call argument instead of the
    /// receiver, so that argument is consulted as a fallback.
    fn resolve_origin(
        &self,
        state: &BuildState,
        receiver: &str,
        expr: &str,
        kind: AllocKind
    ) -> (String, bool) {
        if self.track_arena_allocators && self.is_arena_receiver(state, receiver) {
            return ("ArenaAllocator".to_string(), true);
        }

        if let Some(origin) = self.matcher.resolve(receiver) {
            return (origin.to_string(), false);
        }

        if let Some(param) = self.find_allocator_parameter(state, receiver) {
            return (parameter_origin(&param), false);
        }

        if let Some(alias) = self.find_origin_alias(state, receiver) {
            return (alias, false);
        }

        if kind == AllocKind::AllocPrint
            && let Some(arg) = first_call_argument(expr)
        {
            if self.track_arena_allocators && self.is_arena_receiver(state, &arg) {
                return ("ArenaAllocator".to_string(), true);
            }
            if let Some(origin) = self.matcher.resolve(&arg) {
                return (origin.to_string(), false);
            }
            if let Some(param) = self.find_allocator_parameter(state, &arg) {
                return (parameter_origin(&param), false);
            }
            if let Some(alias) = self.find_origin_alias(state, &arg) {
                return (alias, false);
            }
        }

        (crate::patterns::UNKNOWN_ORIGIN.to_string(), false)
    }

    fn is_arena_receiver(&self, state: &BuildState, receiver: &str) -> bool {
        let in_stack = |scope: usize| state.stack.contains(&scope);

        state
            .tree
            .arena_aliases()
            .iter()
            .any(|a| a.alias == receiver && in_stack(a.scope))
            || state.stack.iter().any(|&scope| {
                state.tree.scopes()[scope]
                    .variables
                    .iter()
                    .any(|v| v.kind == AllocKind::ArenaInit && v.name == receiver)
            })
    }

    fn find_allocator_parameter(&self, state: &BuildState, receiver: &str) -> Option<String> {
        for &scope in state.stack.iter().rev() {
            let record = &state.tree.scopes()[scope];
            if !record.scope_type.is_function_like() {
                continue;
            }
            if let Some(param) = record
                .parameters
                .iter()
                .find(|p| p.is_allocator && p.name == receiver)
            {
                return Some(param.name.clone());
            }
        }
        None
    }

    fn find_origin_alias(&self, state: &BuildState, receiver: &str) -> Option<String> {
        state
            .origin_aliases
            .iter()
            .rev()
            .find(|a| {
                a.name == receiver
                    && match a.scope {
                        None => true,
                        Some(scope) => state.stack.contains(&scope)
                    }
            })
            .map(|a| a.origin.clone())
    }

    /// Record allocator aliases from non-allocating declarations.
    ///
    /// `const aa = arena.allocator();` aliases the arena handle;
    /// `const a = std.heap.page_allocator;` and
    /// `const a = gpa.allocator();` propagate a resolved origin.
    fn record_alias(
        &self,
        state: &mut BuildState,
        line_no: usize,
        name: &str,
        expr: &str,
        scope: Option<usize>
    ) {
        let expr = expr.trim();

        if self.track_arena_allocators
            && let Some(handle) = allocator_view_receiver(expr)
            && self.is_arena_handle(state, &handle)
        {
            trace!(line = line_no, alias = name, arena = %handle, "arena alias");
            state.tree.push_alias(ArenaAlias {
                alias: name.to_string(),
                arena: handle,
                scope: scope.unwrap_or(usize::MAX)
            });
            return;
        }

        let origin = self
            .matcher
            .resolve(expr)
            .map(str::to_string)
            .or_else(|| {
                allocator_view_receiver(expr).and_then(|r| self.find_origin_alias(state, &r))
            });

        if let Some(origin) = origin {
            state.origin_aliases.push(OriginAlias {
                name: name.to_string(),
                origin,
                scope
            });
        }
    }

    fn is_arena_handle(&self, state: &BuildState, name: &str) -> bool {
        state.stack.iter().any(|&scope| {
            state.tree.scopes()[scope]
                .variables
                .iter()
                .any(|v| v.kind == AllocKind::ArenaInit && v.name == name)
        })
    }

    fn record_field_assign(&self, state: &mut BuildState, line_no: usize, text: &str) {
        let Some(eq) = find_assign(text) else {
            return;
        };
        let lhs = text[..eq].trim();
        let rhs = text[eq + 1..].trim().trim_end_matches(';').trim();

        let Some(dot) = lhs.find('.') else {
            return;
        };
        let target = &lhs[..dot];
        if target.is_empty() || !target.bytes().all(is_ident_byte) {
            return;
        }
        if !lhs[dot + 1..]
            .bytes()
            .all(|b| is_ident_byte(b) || b == b'.')
        {
            return;
        }

        let value = first_identifier(rhs);
        if value.is_empty() {
            return;
        }

        if let Some(func) = self.enclosing_function(state) {
            state.tree.scopes_mut()[func].field_assigns.push(FieldAssign {
                target: target.to_string(),
                value,
                line: line_no
            });
        }
    }

    fn note_try(&self, state: &mut BuildState, line_no: usize, text: &str) {
        if !contains_word(text, "try") {
            return;
        }
        if let Some(func) = self.enclosing_function(state) {
            let lines = &mut state.tree.scopes_mut()[func].try_lines;
            if lines.last() != Some(&line_no) {
                lines.push(line_no);
            }
        }
    }

    fn enclosing_function(&self, state: &BuildState) -> Option<usize> {
        state
            .stack
            .iter()
            .rev()
            .copied()
            .find(|&scope| state.tree.scopes()[scope].scope_type.is_function_like())
    }

    fn open_function(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        name: String,
        parameters: Vec<Parameter>,
        return_type: String,
        line_no: usize
    ) -> AppResult<()> {
        let idx = self.open_scope_at(state, ctx, ScopeType::Function, name, line_no)?;
        let scope = &mut state.tree.scopes_mut()[idx];
        scope.parameters = parameters;
        scope.return_type = return_type;
        Ok(())
    }

    fn open_scope(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        scope_type: ScopeType,
        name: String,
        line_no: usize
    ) -> AppResult<usize> {
        self.open_scope_at(state, ctx, scope_type, name, line_no)
    }

    fn open_scope_at(
        &self,
        state: &mut BuildState,
        ctx: &SourceContext,
        scope_type: ScopeType,
        name: String,
        start_line: usize
    ) -> AppResult<usize> {
        let depth = state.stack.len();
        if depth >= self.max_scope_depth {
            return Err(MaxDepthExceededError::new(depth).into());
        }

        let byte_start = ctx.line_start(start_line).unwrap_or(0);
        let mut scope = Scope::open(scope_type, depth, start_line, byte_start);
        scope.name = name;

        let parent = state.stack.last().copied();
        let idx = state.tree.push(scope, parent);
        state.stack.push(idx);
        trace!(line = start_line, ?scope_type, depth, "scope opened");
        Ok(idx)
    }

    fn close_scope(&self, state: &mut BuildState, ctx: &SourceContext, line_no: usize) {
        if let Some(idx) = state.stack.pop() {
            let scope = &mut state.tree.scopes_mut()[idx];
            scope.end_line = Some(line_no);
            scope.byte_end = Some(line_end_offset(ctx, line_no));
            trace!(line = line_no, "scope closed");
        }
    }
}

/// Byte offset just past the end of a 1-based line.
fn line_end_offset(ctx: &SourceContext, line_no: usize) -> usize {
    ctx.line_start(line_no + 1).unwrap_or_else(|| ctx.source_len())
}

/// Parse a function signature slice running from `fn` to its `{`.
///
/// Best-effort: a missing parameter list yields no parameters, a
/// missing return type yields an empty string.
fn parse_signature(text: &str) -> (String, Vec<Parameter>, String) {
    let after_fn = text.strip_prefix("fn").unwrap_or(text);
    let name_end = after_fn.find('(').unwrap_or(after_fn.len());
    let name = after_fn[..name_end].trim().to_string();

    let Some(open) = after_fn.find('(') else {
        return (name, Vec::new(), String::new());
    };

    let mut depth = 0i32;
    let mut close = after_fn.len();
    for (pos, b) in after_fn.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    close = pos;
                    break;
                }
            }
            _ => {}
        }
    }

    let params_text = if close > open {
        &after_fn[open + 1..close]
    } else {
        ""
    };
    let return_type = after_fn
        .get(close + 1..)
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    (name, parse_parameters(params_text), return_type)
}

/// Split a parameter list on top-level commas into records.
fn parse_parameters(text: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let mut depth = 0i32;
    let mut piece_start = 0;

    let flush = |piece: &str, parameters: &mut Vec<Parameter>| {
        let piece = piece.trim();
        if piece.is_empty() {
            return;
        }
        let (name_part, type_text) = match piece.find(':') {
            Some(colon) => (&piece[..colon], piece[colon + 1..].trim()),
            None => (piece, "")
        };
        let name = name_part
            .trim()
            .trim_start_matches("comptime ")
            .trim_start_matches("noalias ")
            .trim()
            .to_string();
        if name.is_empty() {
            return;
        }
        let is_allocator = name == "allocator" || name.ends_with("allocator");
        parameters.push(Parameter {
            name,
            type_text: type_text.to_string(),
            is_allocator
        });
    };

    for (pos, b) in text.bytes().enumerate() {
        match b {
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth -= 1,
            b',' if depth == 0 => {
                flush(&text[piece_start..pos], &mut parameters);
                piece_start = pos + 1;
            }
            _ => {}
        }
    }
    flush(&text[piece_start..], &mut parameters);

    parameters
}

/// Parse a double-quoted string literal starting at `open`.
///
/// # Returns
///
/// (unescaped content, position just past the closing quote)
fn parse_string_literal(raw: &str, open: usize) -> (String, usize) {
    let bytes = raw.as_bytes();
    let mut out = String::new();
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => return (out, i + 1),
            b'\\' if i + 1 < bytes.len() => {
                match bytes[i + 1] {
                    b'"' => out.push('"'),
                    b'\\' => out.push('\\'),
                    b'n' => out.push('\n'),
                    b't' => out.push('\t'),
                    other => {
                        out.push('\\');
                        out.push(other as char);
                    }
                }
                i += 1;
            }
            other => out.push(other as char)
        }
        i += 1;
    }

    (out, bytes.len())
}

/// Find the earliest allocation marker in an initializer expression.
fn detect_allocation(expr: &str) -> Option<(AllocKind, usize)> {
    ALLOC_MARKERS
        .iter()
        .filter_map(|(marker, kind)| expr.find(marker).map(|at| (*kind, at)))
        .min_by_key(|(_, at)| *at)
}

/// Strip call noise from the text left of an allocation marker.
fn clean_receiver(text: &str) -> String {
    let mut receiver = text.trim();
    for prefix in ["try ", "await ", "comptime "] {
        if let Some(stripped) = receiver.strip_prefix(prefix) {
            receiver = stripped.trim();
        }
    }
    receiver
        .trim_start_matches(['&', '(', '*'])
        .trim()
        .to_string()
}

/// Extract the first argument of the first call in an expression.
fn first_call_argument(expr: &str) -> Option<String> {
    let open = expr.find('(')?;
    let rest = &expr[open + 1..];
    let end = rest.find([',', ')'])?;
    let arg = rest[..end].trim();
    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

/// Receiver of an `X.allocator()` view expression, if it is one.
fn allocator_view_receiver(expr: &str) -> Option<String> {
    let expr = expr.trim().trim_start_matches("try ").trim();
    let stripped = expr.strip_suffix(".allocator()")?;
    let stripped = stripped.trim();
    if !stripped.is_empty() && stripped.bytes().all(|b| is_ident_byte(b) || b == b'.') {
        Some(stripped.to_string())
    } else {
        None
    }
}

/// Whether a `{` after `before` opens a real block rather than a
/// literal: `=> {`, `catch {`, `orelse {`, or a container definition.
fn brace_opens_block(before: &str) -> bool {
    let t = before.trim_end();
    if t.is_empty() || t.ends_with("=>") {
        return true;
    }
    if is_container_opener(t) {
        return true;
    }
    let stripped = strip_trailing_payload(t);
    if stripped.len() != t.len() && stripped.is_empty() {
        // A bare `|payload|` before the brace introduces a block body.
        return true;
    }
    matches!(last_word(stripped), Some("catch") | Some("orelse"))
}

/// Whether `before` ends in a container keyword, ignoring a trailing
/// parenthesized group (`enum(u8)`, `packed struct(u32)`).
fn is_container_opener(before: &str) -> bool {
    let mut t = before.trim_end();
    if t.ends_with(')')
        && let Some(open) = t.rfind('(')
    {
        t = t[..open].trim_end();
    }
    matches!(
        last_word(t),
        Some("struct") | Some("union") | Some("enum") | Some("opaque")
    )
}

/// Strip a trailing `|payload|` capture group.
fn strip_trailing_payload(text: &str) -> &str {
    let t = text.trim_end();
    if t.ends_with('|')
        && let Some(open) = t[..t.len() - 1].rfind('|')
    {
        return t[..open].trim_end();
    }
    t
}

fn last_word(text: &str) -> Option<&str> {
    let t = text.trim_end();
    let start = t
        .bytes()
        .rposition(|b| !is_ident_byte(b))
        .map(|p| p + 1)
        .unwrap_or(0);
    let word = &t[start..];
    if word.is_empty() { None } else { Some(word) }
}

/// Position of a top-level `=` that is an assignment, not part of a
/// comparison or arrow operator.
fn find_assign(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                let prev = i.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(i + 1).copied();
                if next == Some(b'=') || next == Some(b'>') {
                    continue;
                }
                if matches!(prev, Some(b'=') | Some(b'!') | Some(b'<') | Some(b'>')) {
                    continue;
                }
                // Compound assignments (`+=`, `|=`, ...) are not
                // declarations or field transfers.
                if matches!(
                    prev,
                    Some(b'+') | Some(b'-') | Some(b'*') | Some(b'/') | Some(b'%') | Some(b'&')
                        | Some(b'|') | Some(b'^')
                ) {
                    continue;
                }
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

fn first_identifier(text: &str) -> String {
    let text = text.trim().trim_start_matches("try ").trim();
    let start = text.bytes().position(is_ident_byte).unwrap_or(text.len());
    let rest = &text[start..];
    let end = rest
        .bytes()
        .position(|b| !is_ident_byte(b))
        .unwrap_or(rest.len());
    rest[..end].to_string()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'@'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_word_at(text: &str, at: usize) -> bool {
    at == 0 || !is_ident_byte(text.as_bytes()[at - 1])
}

fn read_word(text: &str, at: usize) -> &str {
    let bytes = text.as_bytes();
    let mut end = at;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    &text[at..end]
}

fn skip_spaces(text: &str, mut at: usize) -> usize {
    let bytes = text.as_bytes();
    while at < bytes.len() && bytes[at] == b' ' {
        at += 1;
    }
    at
}

/// Whether `word` occurs in `text` delimited by non-identifier bytes.
pub fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(found) = text[from..].find(word) {
        let at = from + found;
        let before_ok = at == 0 || !is_ident_byte(text.as_bytes()[at - 1]);
        let after = at + word.len();
        let after_ok = after >= text.len() || !is_ident_byte(text.as_bytes()[after]);
        if before_ok && after_ok {
            return true;
        }
        from = at + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> ScopeTree {
        let ctx = SourceContext::new(source);
        ScopeTracker::new().build(source, &ctx).unwrap()
    }

    #[test]
    fn test_empty_source() {
        let tree = build("");
        assert!(tree.scopes().is_empty());
    }

    #[test]
    fn test_single_function() {
        let source = "fn main() void {\n}\n";
        let tree = build(source);
        assert_eq!(tree.scopes().len(), 1);
        let scope = &tree.scopes()[0];
        assert_eq!(scope.scope_type, ScopeType::Function);
        assert_eq!(scope.name, "main");
        assert_eq!(scope.start_line, 1);
        assert_eq!(scope.end_line, Some(2));
        assert_eq!(scope.depth, 0);
        assert_eq!(scope.return_type, "void");
        assert_eq!(scope.byte_start, 0);
        assert_eq!(scope.byte_end, Some(source.len()));
    }

    #[test]
    fn test_pub_fn_with_params() {
        let source = "pub fn process(allocator: std.mem.Allocator, count: usize) !void {\n}\n";
        let tree = build(source);
        let scope = &tree.scopes()[0];

        assert_eq!(scope.name, "process");
        assert_eq!(scope.return_type, "!void");
        assert_eq!(scope.parameters.len(), 2);
        assert_eq!(scope.parameters[0].name, "allocator");
        assert!(scope.parameters[0].is_allocator);
        assert_eq!(scope.parameters[1].name, "count");
        assert!(!scope.parameters[1].is_allocator);
    }

    #[test]
    fn test_multiline_signature() {
        let source = "fn transform(\n    allocator: std.mem.Allocator,\n    input: []const u8,\n) ![]u8 {\n    return try allocator.dupe(u8, input);\n}\n";
        let tree = build(source);
        let scope = &tree.scopes()[0];

        assert_eq!(scope.name, "transform");
        assert_eq!(scope.parameters.len(), 2);
        assert!(scope.parameters[0].is_allocator);
        assert_eq!(scope.return_type, "![]u8");
        assert_eq!(scope.start_line, 1);
    }

    #[test]
    fn test_test_declaration() {
        let source = "test \"unit: parser: handles empty input\" {\n}\n";
        let tree = build(source);
        let scope = &tree.scopes()[0];

        assert_eq!(scope.scope_type, ScopeType::TestFunction);
        assert_eq!(scope.name, "unit: parser: handles empty input");
    }

    #[test]
    fn test_test_name_with_escapes() {
        let source = "test \"unit: say \\\"hi\\\"\" {\n}\n";
        let tree = build(source);
        assert_eq!(tree.scopes()[0].name, "unit: say \"hi\"");
    }

    #[test]
    fn test_control_scopes() {
        let source = "fn f(x: bool) void {\n    if (x) {\n    } else {\n    }\n    while (x) {\n    }\n    for (items) |item| {\n        _ = item;\n    }\n    switch (x) {\n        else => {},\n    }\n}\n";
        let tree = build(source);
        let types: Vec<ScopeType> = tree.scopes().iter().map(|s| s.scope_type).collect();

        assert!(types.contains(&ScopeType::IfBlock));
        assert!(types.contains(&ScopeType::ElseBlock));
        assert!(types.contains(&ScopeType::WhileLoop));
        assert!(types.contains(&ScopeType::ForLoop));
        assert!(types.contains(&ScopeType::SwitchBlock));
    }

    #[test]
    fn test_depth_increments() {
        let source = "fn f() void {\n    if (true) {\n        {\n        }\n    }\n}\n";
        let tree = build(source);

        for (idx, scope) in tree.scopes().iter().enumerate() {
            match scope.parent {
                Some(parent) => {
                    assert_eq!(scope.depth, tree.scopes()[parent].depth + 1, "scope {}", idx)
                }
                None => assert_eq!(scope.depth, 0)
            }
            if let Some(end) = scope.end_line {
                assert!(scope.start_line <= end);
            }
            if let Some(byte_end) = scope.byte_end {
                assert!(scope.byte_start < byte_end);
            }
        }
    }

    #[test]
    fn test_max_depth_exceeded() {
        let mut source = String::from("fn f() void {\n");
        for _ in 0..4 {
            source.push_str("{\n");
        }
        source.push_str("}\n}\n");

        let ctx = SourceContext::new(&source);
        let tracker = ScopeTracker::builder().max_scope_depth(3).build();
        assert!(tracker.build(&source, &ctx).is_err());
    }

    #[test]
    fn test_depth_below_limit_completes() {
        let source = "fn f() void {\n{\n{\n}\n}\n}\n";
        let ctx = SourceContext::new(source);
        let tracker = ScopeTracker::builder().max_scope_depth(3).build();
        assert!(tracker.build(source, &ctx).is_ok());
    }

    #[test]
    fn test_unbalanced_braces_close_at_eof() {
        let source = "fn f() void {\n    if (x) {\n";
        let tree = build(source);

        assert_eq!(tree.scopes().len(), 2);
        for scope in tree.scopes() {
            assert_eq!(scope.end_line, Some(2));
            assert_eq!(scope.byte_end, Some(source.len()));
        }
    }

    #[test]
    fn test_byte_end_tracks_closing_line() {
        let source = "fn f() void {\n    if (x) {\n    }\n}\n";
        let tree = build(source);

        let if_block = tree
            .scopes()
            .iter()
            .find(|s| s.scope_type == ScopeType::IfBlock)
            .unwrap();
        // The if block closes on line 3; its end offset is the start
        // of line 4.
        let line4_start = source.match_indices('\n').nth(2).unwrap().0 + 1;
        assert_eq!(if_block.byte_end, Some(line4_start));

        let func = &tree.scopes()[0];
        assert_eq!(func.byte_end, Some(source.len()));
    }

    #[test]
    fn test_variable_recording_with_parameter_origin() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const data = try allocator.alloc(u8, 100);\n    _ = data;\n}\n";
        let tree = build(source);
        let vars = &tree.scopes()[0].variables;

        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "data");
        assert_eq!(vars[0].line, 2);
        assert_eq!(vars[0].kind, AllocKind::Alloc);
        assert_eq!(vars[0].origin, "<parameter:allocator>");
    }

    #[test]
    fn test_variable_column_is_one_based() {
        let source = "fn f(a: std.mem.Allocator) !void {\n    const buf = try a.alloc(u8, 1);\n}\n";
        let tree = build(source);
        let var = &tree.scopes()[0].variables[0];

        let expected = source.lines().nth(1).unwrap().find("buf").unwrap() + 1;
        assert_eq!(var.column, expected);
    }

    #[test]
    fn test_known_allocator_origin() {
        let source =
            "fn f() !void {\n    const data = try std.heap.page_allocator.alloc(u8, 100);\n}\n";
        let tree = build(source);
        assert_eq!(tree.scopes()[0].variables[0].origin, "PageAllocator");
    }

    #[test]
    fn test_unknown_origin() {
        let source = "fn f() !void {\n    const data = try mystery.alloc(u8, 100);\n}\n";
        let tree = build(source);
        assert_eq!(
            tree.scopes()[0].variables[0].origin,
            crate::patterns::UNKNOWN_ORIGIN
        );
    }

    #[test]
    fn test_defer_marks_variable() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const data = try allocator.alloc(u8, 100);\n    defer allocator.free(data);\n}\n";
        let tree = build(source);
        let var = &tree.scopes()[0].variables[0];

        assert!(var.has_defer);
        assert!(!var.has_errdefer);
        assert_eq!(var.defer_line, Some(3));
    }

    #[test]
    fn test_errdefer_marks_variable() {
        let source = "fn create(allocator: std.mem.Allocator) ![]u8 {\n    const data = try allocator.alloc(u8, 100);\n    errdefer allocator.free(data);\n    return data;\n}\n";
        let tree = build(source);
        let var = &tree.scopes()[0].variables[0];

        assert!(!var.has_defer);
        assert!(var.has_errdefer);
    }

    #[test]
    fn test_defer_is_scope_bounded() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const outer = try allocator.alloc(u8, 1);\n    if (true) {\n        defer allocator.free(outer);\n    }\n}\n";
        let tree = build(source);

        // The defer sits in the if block but `outer` is visible there.
        assert!(tree.scopes()[0].variables[0].has_defer);
    }

    #[test]
    fn test_defer_does_not_mark_unrelated() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const a = try allocator.alloc(u8, 1);\n    const b = try allocator.alloc(u8, 2);\n    defer allocator.free(a);\n}\n";
        let tree = build(source);
        let vars = &tree.scopes()[0].variables;

        assert!(vars.iter().any(|v| v.name == "a" && v.has_defer));
        assert!(vars.iter().any(|v| v.name == "b" && !v.has_defer));
    }

    #[test]
    fn test_arena_handle_and_alias() {
        let source = "fn f() !void {\n    var arena = std.heap.ArenaAllocator.init(std.heap.page_allocator);\n    const aa = arena.allocator();\n    const x = try aa.alloc(u8, 10);\n    _ = x;\n}\n";
        let tree = build(source);
        let vars = &tree.scopes()[0].variables;

        let arena = vars.iter().find(|v| v.name == "arena").unwrap();
        assert_eq!(arena.kind, AllocKind::ArenaInit);
        assert_eq!(arena.origin, "ArenaAllocator");

        let x = vars.iter().find(|v| v.name == "x").unwrap();
        assert!(x.arena_managed);
        assert_eq!(x.origin, "ArenaAllocator");

        assert_eq!(tree.arena_aliases().len(), 1);
        assert_eq!(tree.arena_aliases()[0].alias, "aa");
    }

    #[test]
    fn test_gpa_alias_chain() {
        let source = "fn f() !void {\n    var gpa = std.heap.GeneralPurposeAllocator(.{}){};\n    const allocator = gpa.allocator();\n    const buf = try allocator.alloc(u8, 10);\n    _ = buf;\n}\n";
        let tree = build(source);
        let buf = tree.scopes()[0]
            .variables
            .iter()
            .find(|v| v.name == "buf")
            .unwrap();

        assert_eq!(buf.origin, "GeneralPurposeAllocator");
    }

    #[test]
    fn test_return_capture() {
        let source = "fn createData(allocator: std.mem.Allocator) !Data {\n    const buffer = try allocator.alloc(u8, 100);\n    errdefer allocator.free(buffer);\n    return Data{ .buffer = buffer, .size = 100 };\n}\n";
        let tree = build(source);
        let returns = &tree.scopes()[0].returns;

        assert_eq!(returns.len(), 1);
        assert!(returns[0].text.contains(".buffer = buffer"));
    }

    #[test]
    fn test_return_in_nested_scope_attributed_to_function() {
        let source = "fn f(x: bool) u8 {\n    if (x) {\n        return 1;\n    }\n    return 0;\n}\n";
        let tree = build(source);
        assert_eq!(tree.scopes()[0].returns.len(), 2);
    }

    #[test]
    fn test_braceless_if_return_is_captured() {
        let source = "fn f(x: bool) !u8 {\n    if (x) return error.Nope;\n    return 0;\n}\n";
        let tree = build(source);
        assert_eq!(tree.scopes()[0].returns.len(), 2);
    }

    #[test]
    fn test_try_lines_recorded() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const a = try allocator.alloc(u8, 1);\n    try doWork();\n    _ = a;\n}\n";
        let tree = build(source);
        let try_lines = &tree.scopes()[0].try_lines;

        assert!(try_lines.contains(&2));
        assert!(try_lines.contains(&3));
    }

    #[test]
    fn test_field_assign_recorded() {
        let source = "fn build(allocator: std.mem.Allocator) !Result {\n    var result: Result = undefined;\n    const buf = try allocator.alloc(u8, 8);\n    result.buffer = buf;\n    return result;\n}\n";
        let tree = build(source);
        let assigns = &tree.scopes()[0].field_assigns;

        assert_eq!(assigns.len(), 1);
        assert_eq!(assigns[0].target, "result");
        assert_eq!(assigns[0].value, "buf");
    }

    #[test]
    fn test_allocation_in_comment_ignored() {
        let source = "fn f() void {\n    // const x = try allocator.alloc(u8, 100);\n}\n";
        let tree = build(source);
        assert!(tree.scopes()[0].variables.is_empty());
    }

    #[test]
    fn test_allocation_in_string_ignored() {
        let source = "fn f() void {\n    const s = \"allocator.alloc(u8, 100)\";\n    _ = s;\n}\n";
        let tree = build(source);
        assert!(tree.scopes()[0].variables.is_empty());
    }

    #[test]
    fn test_braces_in_strings_do_not_unbalance() {
        let source = "fn f() void {\n    const s = \"{{{\";\n    _ = s;\n}\nfn g() void {\n}\n";
        let tree = build(source);

        let names: Vec<&str> = tree.scopes().iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"f"));
        assert!(names.contains(&"g"));
        assert_eq!(tree.scopes()[0].end_line, Some(4));
    }

    #[test]
    fn test_container_decl_opens_named_block() {
        let source = "const Config = struct {\n    limit: usize,\n    pub fn init() Config {\n        return .{ .limit = 0 };\n    }\n};\n";
        let tree = build(source);

        let container = &tree.scopes()[0];
        assert_eq!(container.scope_type, ScopeType::Block);
        assert_eq!(container.name, "Config");

        let init = tree
            .scopes()
            .iter()
            .find(|s| s.name == "init")
            .expect("nested function tracked");
        assert_eq!(init.scope_type, ScopeType::Function);
        assert_eq!(init.depth, 1);
    }

    #[test]
    fn test_switch_arm_blocks_keep_statements() {
        let source = "fn f(allocator: std.mem.Allocator, op: Op) !void {\n    switch (op) {\n        .add => {\n            const r = try allocator.alloc(u8, 1);\n            defer allocator.free(r);\n        },\n        else => {},\n    }\n}\n";
        let tree = build(source);

        let arm_vars: Vec<&Variable> = tree
            .scopes()
            .iter()
            .flat_map(|s| s.variables.iter())
            .collect();
        assert_eq!(arm_vars.len(), 1);
        assert!(arm_vars[0].has_defer);
    }

    #[test]
    fn test_multiline_struct_literal_keeps_balance() {
        let source = "fn f() Config {\n    const c = Config{\n        .a = 1,\n        .b = 2,\n    };\n    return c;\n}\nfn g() void {\n}\n";
        let tree = build(source);

        let f = tree.scopes().iter().find(|s| s.name == "f").unwrap();
        assert_eq!(f.end_line, Some(7));
        assert!(tree.scopes().iter().any(|s| s.name == "g"));
    }

    #[test]
    fn test_multiline_call_keeps_balance() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const msg = try std.fmt.allocPrint(allocator,\n        \"{d}\",\n        .{1},\n    );\n    defer allocator.free(msg);\n}\n";
        let tree = build(source);
        let f = &tree.scopes()[0];

        assert_eq!(f.variables.len(), 1);
        assert_eq!(f.variables[0].kind, AllocKind::AllocPrint);
        assert_eq!(f.variables[0].origin, "<parameter:allocator>");
        assert!(f.variables[0].has_defer);
        assert_eq!(f.end_line, Some(7));
    }

    #[test]
    fn test_tracking_flags_disable_recording() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const data = try allocator.alloc(u8, 1);\n    defer allocator.free(data);\n}\n";
        let ctx = SourceContext::new(source);

        let no_vars = ScopeTracker::builder()
            .track_variable_lifecycles(false)
            .build()
            .build(source, &ctx)
            .unwrap();
        assert!(no_vars.scopes()[0].variables.is_empty());

        let no_defers = ScopeTracker::builder()
            .track_defer_statements(false)
            .build()
            .build(source, &ctx)
            .unwrap();
        assert!(no_defers.scopes()[0].defers.is_empty());
        assert!(!no_defers.scopes()[0].variables[0].has_defer);
    }

    #[test]
    fn test_block_bodied_defer_marks_variables() {
        let source = "fn f(allocator: std.mem.Allocator) !void {\n    const a = try allocator.alloc(u8, 1);\n    const b = try allocator.alloc(u8, 2);\n    defer {\n        allocator.free(a);\n        allocator.free(b);\n    }\n}\n";
        let tree = build(source);
        let vars = &tree.scopes()[0].variables;

        assert!(vars.iter().all(|v| v.has_defer));
    }

    #[test]
    fn test_contains_word_boundaries() {
        assert!(contains_word("allocator.free(data)", "data"));
        assert!(!contains_word("allocator.free(metadata)", "data"));
        assert!(contains_word("try x", "try"));
        assert!(!contains_word("retry x", "try"));
        assert!(!contains_word("trying", "try"));
    }

    #[test]
    fn test_parse_signature_malformed() {
        let (name, params, ret) = parse_signature("fn broken");
        assert_eq!(name, "broken");
        assert!(params.is_empty());
        assert_eq!(ret, "");
    }

    #[test]
    fn test_parse_parameters_nested_types() {
        let params = parse_parameters("map: std.AutoHashMap(u32, []const u8), allocator: Allocator");
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "map");
        assert_eq!(params[1].name, "allocator");
        assert!(params[1].is_allocator);
    }

    #[test]
    fn test_find_assign_skips_comparisons() {
        assert_eq!(find_assign("a == b"), None);
        assert_eq!(find_assign("a != b"), None);
        assert_eq!(find_assign("a <= b"), None);
        assert_eq!(find_assign("a >= b"), None);
        assert_eq!(find_assign("a += b"), None);
        assert!(find_assign("a = b").is_some());
        assert!(find_assign("result.buf = b").is_some());
    }

    #[test]
    fn test_detect_allocation_kinds() {
        assert_eq!(
            detect_allocation("try a.alloc(u8, 1)").map(|(k, _)| k),
            Some(AllocKind::Alloc)
        );
        assert_eq!(
            detect_allocation("try a.create(Node)").map(|(k, _)| k),
            Some(AllocKind::Create)
        );
        assert_eq!(
            detect_allocation("try a.dupe(u8, s)").map(|(k, _)| k),
            Some(AllocKind::Dupe)
        );
        assert_eq!(
            detect_allocation("try a.dupeZ(u8, s)").map(|(k, _)| k),
            Some(AllocKind::Dupe)
        );
        assert_eq!(
            detect_allocation("std.heap.ArenaAllocator.init(base)").map(|(k, _)| k),
            Some(AllocKind::ArenaInit)
        );
        assert_eq!(detect_allocation("arena.allocator()"), None);
        assert_eq!(detect_allocation("foo()"), None);
    }
}
