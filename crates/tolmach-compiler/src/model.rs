//! Grammar model construction from the CST.
//!
//! Two-pass: terminal-like names are collected first (declared terminals,
//! external token names, local token names) so body references can be
//! classified as rule or terminal references without forward declarations.

use std::collections::HashSet;

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{
    AssignOp, Assoc, Cardinality, ConflictSet, Expr, ExternalContext, ExternalTokens, Grammar,
    InfixRule, KeywordPromotion, LocalToken, LocalTokens, PrecLevel, PrecedenceBlock,
    PromotionMode, RuleDef, TerminalDef,
};
use tolmach_core::{Interner, Span, Symbol};

use crate::syntax::ast::{self, GramExpr};
use crate::syntax::{SyntaxKind, SyntaxNode, SyntaxToken, range_to_span};

/// Build the grammar model from a parsed CST, reporting structural problems
/// the parser could not see.
pub fn build_grammar(root: &ast::Root, diagnostics: &mut Diagnostics) -> Grammar {
    let mut builder = ModelBuilder {
        interner: Interner::new(),
        terminal_names: HashSet::new(),
        diagnostics,
    };
    builder.build(root)
}

struct ModelBuilder<'d> {
    interner: Interner,
    /// Names that resolve to terminal references inside rule bodies.
    terminal_names: HashSet<Symbol>,
    diagnostics: &'d mut Diagnostics,
}

impl ModelBuilder<'_> {
    fn build(&mut self, root: &ast::Root) -> Grammar {
        let name = root
            .grammar_decl()
            .and_then(|d| d.name())
            .map(|t| t.text().to_string())
            .unwrap_or_default();

        let terminals: Vec<TerminalDef> = root
            .terminals()
            .filter_map(|t| self.build_terminal(&t))
            .collect();
        for terminal in &terminals {
            self.terminal_names.insert(terminal.name);
        }

        let external_tokens: Vec<ExternalTokens> = root
            .external_tokens()
            .filter_map(|e| self.build_external_tokens(&e))
            .collect();
        for group in &external_tokens {
            self.terminal_names.extend(group.names.iter().copied());
        }

        let local_tokens: Vec<LocalTokens> = root
            .local_tokens()
            .filter_map(|l| self.build_local_tokens(&l))
            .collect();
        for group in &local_tokens {
            self.terminal_names
                .extend(group.tokens.iter().map(|t| t.name));
        }

        // Promotion targets are token classes; references to them inside
        // rule bodies are terminal references.
        for promotion in root.promotions() {
            for mapping in promotion.mappings() {
                if let Some(target) = mapping.target() {
                    let sym = self.interner.intern(target.text());
                    self.terminal_names.insert(sym);
                }
            }
        }

        let rules = root.rules().filter_map(|r| self.build_rule(&r)).collect();
        let precedences = root
            .prec_blocks()
            .map(|b| self.build_prec_block(&b))
            .collect();
        let conflicts = root
            .conflicts_blocks()
            .flat_map(|b| self.build_conflicts(&b))
            .collect();
        let infixes: Vec<InfixRule> = root
            .infix_decls()
            .filter_map(|i| self.build_infix(&i))
            .collect();
        if !infixes.is_empty() {
            // Binary productions generated from infix declarations bind
            // these three fields.
            self.interner.intern("left");
            self.interner.intern("operator");
            self.interner.intern("right");
        }
        let promotions = root
            .promotions()
            .filter_map(|p| self.build_promotion(&p))
            .collect();
        let external_contexts = root
            .external_contexts()
            .filter_map(|c| self.build_external_context(&c))
            .collect();

        Grammar {
            name,
            rules,
            terminals,
            precedences,
            conflicts,
            infixes,
            promotions,
            external_tokens,
            external_contexts,
            local_tokens,
            interner: std::mem::take(&mut self.interner),
        }
    }

    fn intern_token(&mut self, token: &SyntaxToken) -> Symbol {
        self.interner.intern(token.text())
    }

    fn build_rule(&mut self, rule: &ast::RuleNode) -> Option<RuleDef> {
        let name = self.intern_token(&rule.name()?);
        let type_name = rule.returns_type().map(|t| self.intern_token(&t));

        let mut dynamic_precedence = None;
        let mut prec_marker = None;
        for annotation in rule.annotations() {
            self.apply_annotation(&annotation, &mut dynamic_precedence, &mut prec_marker);
        }

        let body = match rule.body() {
            Some(expr) => self.build_expr(&expr),
            None => Expr::empty(),
        };

        Some(RuleDef {
            name,
            entry: rule.is_entry(),
            type_name,
            body,
            dynamic_precedence,
            prec_marker,
            span: node_span(rule.as_cst()),
        })
    }

    fn apply_annotation(
        &mut self,
        annotation: &ast::Annotation,
        dynamic_precedence: &mut Option<i32>,
        prec_marker: &mut Option<Symbol>,
    ) {
        let Some(name) = annotation.name() else {
            return;
        };

        match name.text() {
            "dynamicPrecedence" => {
                let value = annotation.int_arg().and_then(|t| t.text().parse().ok());
                if value.is_none() {
                    self.error(
                        node_span(annotation.as_cst()),
                        "`@dynamicPrecedence` takes an integer argument",
                    );
                }
                *dynamic_precedence = value;
            }
            "precMarker" => match annotation.name_arg() {
                Some(arg) => *prec_marker = Some(self.intern_token(&arg)),
                None => self.error(
                    node_span(annotation.as_cst()),
                    "`@precMarker` takes a precedence level argument",
                ),
            },
            other => {
                let message = format!("unknown annotation `@{other}`");
                self.error(token_span(&name), message);
            }
        }
    }

    fn build_expr(&mut self, expr: &GramExpr) -> Expr {
        match expr {
            GramExpr::Alt(alt) => {
                Expr::Alternative(alt.alternatives().map(|e| self.build_expr(&e)).collect())
            }
            GramExpr::Seq(seq) => {
                Expr::Sequence(seq.elements().map(|e| self.build_expr(&e)).collect())
            }
            GramExpr::Quantified(q) => {
                let inner = q
                    .inner()
                    .map(|e| self.build_expr(&e))
                    .unwrap_or_else(Expr::empty);
                let cardinality = match q.operator().map(|t| t.kind()) {
                    Some(SyntaxKind::Star) => Cardinality::ZeroOrMore,
                    Some(SyntaxKind::Plus) => Cardinality::OneOrMore,
                    _ => Cardinality::Optional,
                };
                Expr::Repeat {
                    inner: Box::new(inner),
                    cardinality,
                }
            }
            GramExpr::Assignment(assign) => {
                let field = assign
                    .field()
                    .map(|t| self.intern_token(&t))
                    .unwrap_or_else(|| self.interner.intern(""));
                let op = match assign.operator().map(|t| t.kind()) {
                    Some(SyntaxKind::PlusEquals) => AssignOp::Append,
                    Some(SyntaxKind::QuestionEquals) => AssignOp::Bool,
                    _ => AssignOp::Single,
                };
                let inner = assign
                    .value()
                    .map(|e| self.build_expr(&e))
                    .unwrap_or_else(Expr::empty);
                Expr::Assignment {
                    field,
                    op,
                    inner: Box::new(inner),
                }
            }
            GramExpr::CrossRef(cross) => {
                let target = cross
                    .target()
                    .map(|t| self.intern_token(&t))
                    .unwrap_or_else(|| self.interner.intern(""));
                let token = cross.token().map(|t| self.intern_token(&t));
                Expr::CrossRef { target, token }
            }
            GramExpr::Action(action) => {
                let type_name = action
                    .type_name()
                    .map(|t| self.intern_token(&t))
                    .unwrap_or_else(|| self.interner.intern(""));
                let graft = action.graft_field().map(|field| {
                    let op = match action.graft_operator().map(|t| t.kind()) {
                        Some(SyntaxKind::PlusEquals) => AssignOp::Append,
                        _ => AssignOp::Single,
                    };
                    (self.intern_token(&field), op)
                });
                Expr::Action { type_name, graft }
            }
            GramExpr::Literal(literal) => Expr::Keyword(self.interner.intern(&literal.text())),
            GramExpr::Ref(reference) => {
                let Some(name) = reference.name() else {
                    return Expr::empty();
                };
                let sym = self.intern_token(&name);
                if self.terminal_names.contains(&sym) {
                    Expr::TerminalRef(sym)
                } else {
                    Expr::RuleRef(sym)
                }
            }
            GramExpr::Paren(paren) => match paren.inner() {
                Some(inner) => self.build_expr(&inner),
                None => Expr::empty(),
            },
        }
    }

    fn build_terminal(&mut self, terminal: &ast::TerminalNode) -> Option<TerminalDef> {
        let name = self.intern_token(&terminal.name()?);
        let regex = terminal
            .regex()
            .map(|t| strip_regex_delimiters(t.text()))
            .unwrap_or_default();

        Some(TerminalDef {
            name,
            regex,
            hidden: terminal.is_hidden(),
            span: node_span(terminal.as_cst()),
        })
    }

    fn build_prec_block(&mut self, block: &ast::PrecBlock) -> PrecedenceBlock {
        let levels = block
            .levels()
            .filter_map(|level| {
                let name = self.intern_token(&level.name()?);
                let assoc = match level.assoc_token().map(|t| t.kind()) {
                    Some(SyntaxKind::KwRight) => Assoc::Right,
                    Some(SyntaxKind::KwNonassoc) => Assoc::NonAssoc,
                    _ => Assoc::Left,
                };
                Some(PrecLevel {
                    name,
                    assoc,
                    span: node_span(level.as_cst()),
                })
            })
            .collect();

        PrecedenceBlock {
            levels,
            span: node_span(block.as_cst()),
        }
    }

    fn build_conflicts(&mut self, block: &ast::ConflictsBlock) -> Vec<ConflictSet> {
        block
            .sets()
            .map(|set| ConflictSet {
                rules: set.names().map(|t| self.interner.intern(t.text())).collect(),
                span: node_span(set.as_cst()),
            })
            .collect()
    }

    fn build_infix(&mut self, infix: &ast::InfixDecl) -> Option<InfixRule> {
        let name = self.intern_token(&infix.name()?);
        let base = self.intern_token(&infix.base()?);
        let groups = infix
            .groups()
            .map(|group| {
                group
                    .literals()
                    .map(|lit| self.interner.intern(&lit.text()))
                    .collect()
            })
            .collect();

        Some(InfixRule {
            name,
            base,
            groups,
            span: node_span(infix.as_cst()),
        })
    }

    fn build_promotion(&mut self, block: &ast::PromotionBlock) -> Option<KeywordPromotion> {
        let base = self.intern_token(&block.base_name()?);
        let mappings = block
            .mappings()
            .filter_map(|mapping| {
                let literal = self.interner.intern(&mapping.literal()?.text());
                let target = self.intern_token(&mapping.target()?);
                Some((literal, target))
            })
            .collect();

        Some(KeywordPromotion {
            mode: if block.is_extend() {
                PromotionMode::Extend
            } else {
                PromotionMode::Specialize
            },
            base,
            mappings,
            span: node_span(block.as_cst()),
        })
    }

    fn build_external_tokens(&mut self, node: &ast::ExternalTokensNode) -> Option<ExternalTokens> {
        let path = node.path()?.text();
        let names = node
            .names()
            .map(|t| self.interner.intern(t.text()))
            .collect();

        Some(ExternalTokens {
            path,
            names,
            span: node_span(node.as_cst()),
        })
    }

    fn build_external_context(
        &mut self,
        node: &ast::ExternalContextNode,
    ) -> Option<ExternalContext> {
        let name = self.intern_token(&node.name()?);
        let path = node.path()?.text();

        Some(ExternalContext {
            name,
            path,
            span: node_span(node.as_cst()),
        })
    }

    fn build_local_tokens(&mut self, node: &ast::LocalTokensNode) -> Option<LocalTokens> {
        let rule = self.intern_token(&node.rule_name()?);
        let tokens = node
            .defs()
            .filter_map(|def| {
                let name = self.intern_token(&def.name()?);
                let regex = def
                    .regex()
                    .map(|t| strip_regex_delimiters(t.text()))
                    .unwrap_or_default();
                Some(LocalToken {
                    name,
                    regex,
                    span: node_span(def.as_cst()),
                })
            })
            .collect();
        let else_name = node
            .else_branch()
            .and_then(|e| e.name())
            .map(|t| self.intern_token(&t))
            .unwrap_or_else(|| self.interner.intern(""));

        Some(LocalTokens {
            rule,
            tokens,
            else_name,
            span: node_span(node.as_cst()),
        })
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics
            .report(Severity::Error, Stage::Validation, span)
            .message(message)
            .emit();
    }
}

/// `/body/` → `body`, resolving `\/` escapes.
fn strip_regex_delimiters(raw: &str) -> String {
    let inner = raw
        .strip_prefix('/')
        .and_then(|s| s.strip_suffix('/'))
        .unwrap_or(raw);
    inner.replace(r"\/", "/")
}

fn node_span(node: &SyntaxNode) -> Span {
    range_to_span(node.text_range())
}

fn token_span(token: &SyntaxToken) -> Span {
    range_to_span(token.text_range())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::parse_cst;
    use tolmach_core::Diagnostics;

    fn model_of(source: &str) -> (Grammar, Diagnostics) {
        let (root, parse_diags) = parse_cst(source);
        assert!(
            parse_diags.is_empty(),
            "parse errors:\n{}",
            parse_diags.printer().source(source).render()
        );
        let mut diagnostics = Diagnostics::new();
        let root = ast::Root::cast(root).unwrap();
        let grammar = build_grammar(&root, &mut diagnostics);
        (grammar, diagnostics)
    }

    #[test]
    fn rules_and_terminals() {
        let (grammar, diags) = model_of(
            "entry Model: 'model' name=ID; \
             terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/; \
             hidden terminal WS: /\\s+/;",
        );
        assert!(diags.is_empty());
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.terminals.len(), 2);
        assert!(grammar.terminals[1].hidden);

        let entry = grammar.entry_rule().unwrap();
        assert_eq!(grammar.resolve(entry.name), "Model");
        let Expr::Sequence(items) = &entry.body else {
            panic!("expected a sequence body");
        };
        assert!(matches!(items[0], Expr::Keyword(_)));
        assert!(matches!(
            items[1],
            Expr::Assignment {
                op: AssignOp::Single,
                ..
            }
        ));
    }

    #[test]
    fn references_classify_as_rule_or_terminal() {
        let (grammar, _) = model_of(
            "entry A: b=B c=ID; B: 'b'; terminal ID: /[a-z]+/;",
        );
        let Expr::Sequence(items) = &grammar.rules[0].body else {
            panic!("expected a sequence body");
        };
        let Expr::Assignment { inner: b, .. } = &items[0] else {
            panic!()
        };
        let Expr::Assignment { inner: c, .. } = &items[1] else {
            panic!()
        };
        assert!(matches!(**b, Expr::RuleRef(_)));
        assert!(matches!(**c, Expr::TerminalRef(_)));
    }

    #[test]
    fn cross_reference_with_default_token() {
        let (grammar, _) = model_of(
            "entry G: 'hello' person=[Person]; Person: 'person' name=ID; terminal ID: /[a-z]+/;",
        );
        let Expr::Sequence(items) = &grammar.rules[0].body else {
            panic!("expected a sequence body");
        };
        let Expr::Assignment { inner, .. } = &items[1] else {
            panic!()
        };
        let Expr::CrossRef { target, token } = &**inner else {
            panic!("expected a cross-reference");
        };
        assert_eq!(grammar.resolve(*target), "Person");
        assert!(token.is_none());
    }

    #[test]
    fn regex_delimiters_are_stripped() {
        let (grammar, _) = model_of("entry A: x=N; terminal N: /[0-9]\\/+/;");
        assert_eq!(grammar.terminals[0].regex, "[0-9]/+");
    }

    #[test]
    fn annotations_are_interpreted() {
        let (grammar, diags) = model_of(
            "precedence { Lvl left; } \
             @dynamicPrecedence(2) @precMarker(Lvl) entry A: 'a';",
        );
        assert!(diags.is_empty());
        let rule = &grammar.rules[0];
        assert_eq!(rule.dynamic_precedence, Some(2));
        assert_eq!(grammar.resolve(rule.prec_marker.unwrap()), "Lvl");
    }

    #[test]
    fn unknown_annotation_is_reported() {
        let (_, diags) = model_of("@mystery entry A: 'a';");
        assert!(diags.has_errors());
    }

    #[test]
    fn promotions_keep_declaration_order() {
        let (grammar, _) = model_of(
            "entry A: t=ID; terminal ID: /[a-z]+/; \
             specialize ID { \"if\" => IfKeyword; \"else\" => ElseKeyword; }",
        );
        let promo = &grammar.promotions[0];
        assert_eq!(promo.mode, PromotionMode::Specialize);
        assert_eq!(grammar.resolve(promo.mappings[0].0), "if");
        assert_eq!(grammar.resolve(promo.mappings[1].0), "else");
    }

    #[test]
    fn external_and_local_token_names_are_terminals() {
        let (grammar, _) = model_of(
            "entry A: x=Indent y=Esc; \
             external tokens from \"./scanner\" { Indent, Dedent } \
             local tokens in Str { Esc: /x/; @else StrContent; }",
        );
        let Expr::Sequence(items) = &grammar.rules[0].body else {
            panic!("expected a sequence body");
        };
        for item in items {
            let Expr::Assignment { inner, .. } = item else {
                panic!()
            };
            assert!(matches!(**inner, Expr::TerminalRef(_)));
        }
    }

    #[test]
    fn infix_groups() {
        let (grammar, _) = model_of("infix Bin on Expr: '+' | '-' > '*' | '/'; entry Expr: 'x';");
        let infix = &grammar.infixes[0];
        assert_eq!(infix.groups.len(), 2);
        assert_eq!(infix.groups[0].len(), 2);
        assert_eq!(grammar.resolve(infix.groups[1][0]), "*");
    }
}
