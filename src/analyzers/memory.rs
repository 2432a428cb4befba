// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Memory analyzer for allocation lifecycle defects.
//!
//! Consumes the scope tree and emits memory-class issues: allocations
//! without `defer` cleanup, transferred allocations without `errdefer`
//! protection, allocator choices that violate the project policy, and
//! arena handles that are never deinitialized.
//!
//! Ownership-transfer inference suppresses cleanup diagnostics for
//! allocations that leave the function: a variable is transferred when
//! it is returned directly or as a struct field value, when it is
//! assigned into a field of a returned value, or when the enclosing
//! function matches an ownership rule and returns a value.

use masterror::AppResult;
use tracing::debug;

use crate::{
    analyzer::{Analyzer, Issue, IssueType, Severity},
    config::{Config, OwnershipPattern},
    patterns::UNKNOWN_ORIGIN,
    scope::{AllocKind, ScopeTree, ScopeType, Variable},
    scope_tracker::{ScopeTracker, contains_word},
    source_context::SourceContext
};

/// Analyzer for memory-management defects.
///
/// # Examples
///
/// ```
/// use zigcheck::{
///     analyzer::{Analyzer, IssueType},
///     analyzers::memory::MemoryAnalyzer,
///     config::Config
/// };
///
/// let source = "fn f(allocator: std.mem.Allocator) !void {\n    const buf = try allocator.alloc(u8, 100);\n    _ = buf;\n}\n";
/// let issues = MemoryAnalyzer::new()
///     .analyze(source, "main.zig", &Config::default())
///     .unwrap();
/// assert_eq!(issues.len(), 1);
/// assert_eq!(issues[0].issue_type, IssueType::MissingDefer);
/// ```
pub struct MemoryAnalyzer;

impl MemoryAnalyzer {
    /// Create new memory analyzer instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Whether ownership of `var` leaves the enclosing function.
    ///
    /// # Arguments
    ///
    /// * `tree` - Completed scope tree
    /// * `func` - Index of the enclosing function-like scope
    /// * `var` - Variable under test
    /// * `ownership` - Configured ownership rules
    fn is_transferred(
        tree: &ScopeTree,
        func: Option<usize>,
        var: &Variable,
        ownership: &[OwnershipPattern]
    ) -> bool {
        let Some(func) = func else {
            return false;
        };
        let scope = &tree.scopes()[func];

        // Returned directly, or referenced as a field value inside a
        // returned expression.
        if scope
            .returns
            .iter()
            .any(|r| contains_word(&r.text, &var.name))
        {
            return true;
        }

        // Assigned into a field of a value that is itself returned.
        if scope.field_assigns.iter().any(|assign| {
            assign.value == var.name
                && scope
                    .returns
                    .iter()
                    .any(|r| contains_word(&r.text, &assign.target))
        }) {
            return true;
        }

        // The function's name or return type promises a transfer and
        // some path returns a value.
        if scope.scope_type == ScopeType::Function
            && scope.returns.iter().any(|r| !r.text.is_empty())
            && ownership.iter().any(|rule| {
                rule.matches_function(&scope.name) || rule.matches_return_type(&scope.return_type)
            })
        {
            return true;
        }

        false
    }

    /// Whether the arena handle has a `deinit` teardown in its scope.
    fn arena_has_deinit(tree: &ScopeTree, scope_idx: usize, name: &str) -> bool {
        tree.subtree(scope_idx).into_iter().any(|idx| {
            tree.scopes()[idx]
                .defers
                .iter()
                .any(|d| contains_word(&d.text, name) && d.text.contains(".deinit"))
        })
    }

    /// Whether any failable statement sits between the declaration and
    /// the end of the function.
    fn has_try_after(tree: &ScopeTree, func: usize, decl_line: usize) -> bool {
        tree.scopes()[func]
            .try_lines
            .iter()
            .any(|&line| line > decl_line)
    }

    fn allocator_policy_issue(
        var: &Variable,
        file_path: &str,
        allowed: &[String]
    ) -> Option<Issue> {
        if var.origin.starts_with("<parameter:") {
            // The caller chose this allocator; policy does not apply.
            return None;
        }

        if var.origin == UNKNOWN_ORIGIN {
            let suggestion = if allowed.is_empty() {
                "use a recognized allocator or declare a custom allocator pattern for it"
                    .to_string()
            } else {
                format!("use one of the allowed allocators: {}", allowed.join(", "))
            };
            return Some(Issue {
                file_path:  file_path.to_string(),
                line:       var.line,
                column:     var.column,
                issue_type: IssueType::IncorrectAllocator,
                severity:   Severity::Warning,
                message:    format!(
                    "Allocation assigned to '{}' uses an unrecognized allocator",
                    var.name
                ),
                suggestion: Some(suggestion)
            });
        }

        if !allowed.is_empty() && !allowed.iter().any(|a| a == &var.origin) {
            return Some(Issue {
                file_path:  file_path.to_string(),
                line:       var.line,
                column:     var.column,
                issue_type: IssueType::IncorrectAllocator,
                severity:   Severity::Warning,
                message:    format!(
                    "Allocator '{}' is not allowed by project policy",
                    var.origin
                ),
                suggestion: Some(format!(
                    "use one of the allowed allocators: {}",
                    allowed.join(", ")
                ))
            });
        }

        None
    }

    fn cleanup_suggestion(var: &Variable) -> String {
        let free_call = match var.kind {
            AllocKind::Create => "destroy",
            _ => "free"
        };
        format!("add `defer allocator.{}({});`", free_call, var.name)
    }
}

impl Analyzer for MemoryAnalyzer {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn analyze(&self, source: &str, file_path: &str, config: &Config) -> AppResult<Vec<Issue>> {
        let ctx = SourceContext::new(source);
        let tracker = ScopeTracker::from_config(config)?;

        let mut issues = Vec::new();
        for note in tracker.matcher().notes() {
            issues.push(Issue {
                file_path:  file_path.to_string(),
                line:       1,
                column:     1,
                issue_type: IssueType::PatternWarning,
                severity:   note.severity,
                message:    note.message.clone(),
                suggestion: None
            });
        }

        let tree = tracker.build(source, &ctx)?;
        let ownership = tracker.ownership_patterns();
        let allowed = &config.memory.allowed_allocators;

        for (scope_idx, scope) in tree.scopes().iter().enumerate() {
            for var in &scope.variables {
                if var.kind == AllocKind::ArenaInit {
                    if config.memory.check_arena_usage
                        && !Self::arena_has_deinit(&tree, scope_idx, &var.name)
                    {
                        issues.push(Issue {
                            file_path:  file_path.to_string(),
                            line:       var.line,
                            column:     var.column,
                            issue_type: IssueType::ArenaNotDeinitialized,
                            severity:   Severity::Error,
                            message:    format!(
                                "Arena allocator '{}' is never deinitialized",
                                var.name
                            ),
                            suggestion: Some(format!("add `defer {}.deinit();`", var.name))
                        });
                    }
                    continue;
                }

                if let Some(issue) = Self::allocator_policy_issue(var, file_path, allowed) {
                    issues.push(issue);
                }

                let func = tree.enclosing_function(scope_idx);
                let transferred = Self::is_transferred(&tree, func, var, ownership);

                if transferred {
                    if config.memory.report_transfers {
                        issues.push(Issue {
                            file_path:  file_path.to_string(),
                            line:       var.line,
                            column:     var.column,
                            issue_type: IssueType::OwnershipTransfer,
                            severity:   Severity::Info,
                            message:    format!(
                                "Ownership of '{}' transfers to the caller",
                                var.name
                            ),
                            suggestion: None
                        });
                    }
                    if config.memory.check_defer
                        && !var.has_errdefer
                        && func.is_some_and(|f| Self::has_try_after(&tree, f, var.line))
                    {
                        issues.push(Issue {
                            file_path:  file_path.to_string(),
                            line:       var.line,
                            column:     var.column,
                            issue_type: IssueType::MissingErrdefer,
                            severity:   Severity::Warning,
                            message:    format!(
                                "'{}' leaks if a later operation fails before ownership \
                                 transfers",
                                var.name
                            ),
                            suggestion: Some(format!(
                                "add `errdefer allocator.free({});` after the allocation",
                                var.name
                            ))
                        });
                    }
                    continue;
                }

                let arena_managed = var.arena_managed || var.origin == "ArenaAllocator";
                if config.memory.check_defer && !arena_managed && !var.has_defer {
                    issues.push(Issue {
                        file_path:  file_path.to_string(),
                        line:       var.line,
                        column:     var.column,
                        issue_type: IssueType::MissingDefer,
                        severity:   Severity::Error,
                        message:    format!(
                            "Allocation assigned to '{}' is never freed in this scope",
                            var.name
                        ),
                        suggestion: Some(Self::cleanup_suggestion(var))
                    });
                }
            }
        }

        debug!(file = file_path, issues = issues.len(), "memory analysis done");
        Ok(issues)
    }
}

impl Default for MemoryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
