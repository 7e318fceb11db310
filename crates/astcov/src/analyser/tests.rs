//! Tests for branch analysis, line projection and the pipeline

use super::*;
use crate::fixture::SourceFixture;
use crate::hits::HitSourceError;
use crate::location::Location;
use crate::node::{BranchKind, NodeId};
use crate::range::ByteRange;
use crate::report::{BranchEntry, BranchLabel};

fn analyse(raw: &RawNode, hits: &dyn HitSource) -> CoverageResult {
    Analysis::default().run(raw, hits).unwrap()
}

fn with(config: AnalysisConfig, raw: &RawNode, hits: &dyn HitSource) -> CoverageResult {
    Analysis::new(config).run(raw, hits).unwrap()
}

fn only_entry(result: &CoverageResult) -> &BranchEntry {
    assert_eq!(result.branches.len(), 1, "expected a single branch entry");
    result.branches.iter().next().unwrap()
}

mod conditional_tests {
    use super::*;

    const SOURCE: &str = "if DeepCover\n  66\nend";

    fn tree(fx: &SourceFixture, kind: &str) -> RawNode {
        fx.node_at(kind, fx.span_between(kind, "end"))
            .child(fx.node("const", "DeepCover").nil().leaf("DeepCover"))
            .child(fx.node("int", "66"))
            .nil()
    }

    #[test]
    fn test_then_taken() {
        let fx = SourceFixture::new(SOURCE);
        let hits = fx
            .hits()
            .span(fx.span_between("if", "end"), 1)
            .at("DeepCover", 1)
            .at("66", 1)
            .build();
        let result = analyse(&tree(&fx, "if"), &hits);
        let entry = only_entry(&result);

        assert_eq!(entry.key.kind, BranchKind::If);
        assert_eq!(entry.key.span.to_tuple(), [1, 0, 3, 3]);
        let then = entry.outcome(BranchLabel::Then).unwrap();
        assert_eq!((then.hits, then.span.to_tuple()), (1, [2, 2, 2, 4]));
        let otherwise = entry.outcome(BranchLabel::Else).unwrap();
        assert_eq!((otherwise.hits, otherwise.span.to_tuple()), (0, [1, 0, 3, 3]));
    }

    #[test]
    fn test_absent_else_counts_remaining_evaluations() {
        let fx = SourceFixture::new(SOURCE);
        let hits = fx
            .hits()
            .span(fx.span_between("if", "end"), 3)
            .at("DeepCover", 3)
            .at("66", 1)
            .build();
        let result = analyse(&tree(&fx, "if"), &hits);
        assert_eq!(
            only_entry(&result).hits_by_label(),
            vec![(BranchLabel::Then, 1), (BranchLabel::Else, 2)]
        );
    }

    #[test]
    fn test_unless_swaps_labels() {
        let fx = SourceFixture::new("unless DeepCover\n  66\nend");
        let hits = fx
            .hits()
            .span(fx.span_between("unless", "end"), 1)
            .at("DeepCover", 1)
            .at("66", 1)
            .build();
        let result = analyse(&tree(&fx, "unless"), &hits);
        let entry = only_entry(&result);

        assert_eq!(entry.key.kind, BranchKind::If);
        let then = entry.outcome(BranchLabel::Then).unwrap();
        assert_eq!((then.hits, then.span.to_tuple()), (0, [1, 0, 3, 3]));
        let otherwise = entry.outcome(BranchLabel::Else).unwrap();
        assert_eq!((otherwise.hits, otherwise.span.to_tuple()), (1, [2, 2, 2, 4]));
    }

    #[test]
    fn test_both_clauses_absent() {
        let fx = SourceFixture::new("if ready; end");
        let raw = fx
            .node("if", "if ready; end")
            .child(fx.node("send", "ready").nil().leaf("ready"))
            .nil()
            .nil();
        let hits = fx.hits().at("if ready; end", 2).at("ready", 2).build();
        assert_eq!(
            only_entry(&analyse(&raw, &hits)).hits_by_label(),
            vec![(BranchLabel::Then, 0), (BranchLabel::Else, 2)]
        );
    }

    #[test]
    fn test_ternary_uses_condition_completions() {
        // condition raised once out of three evaluations
        let fx = SourceFixture::new("check ? a : b");
        let raw = fx
            .node("ternary", "check ? a : b")
            .child(fx.node("send", "check"))
            .child(fx.node("send", "a"))
            .child(fx.node("send", "b"));
        let hits = fx
            .hits()
            .at("check ? a : b", 3)
            .at("check", 3)
            .completions("check", 2)
            .at("a", 2)
            .build();
        let entry = analyse(&raw, &hits);
        let entry = only_entry(&entry);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::Then, 2), (BranchLabel::Else, 0)]
        );
        assert_eq!(entry.outcome(BranchLabel::Else).unwrap().span.to_tuple(), [1, 12, 1, 13]);
    }
}

mod short_circuit_tests {
    use super::*;

    #[test]
    fn test_binary_spelling_matches_and() {
        let fx = SourceFixture::new("123 && 45");
        let raw = fx
            .node("binary", "123 && 45")
            .child(fx.node("int", "123"))
            .leaf("&&")
            .child(fx.node("int", "45"));
        let hits = fx.hits().at("123 && 45", 1).at("123", 1).at("45", 1).build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);
        assert_eq!(entry.key.kind, BranchKind::And);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::Then, 1), (BranchLabel::Else, 0)]
        );
    }

    #[test]
    fn test_or_assign() {
        let fx = SourceFixture::new("a ||= 1");
        let raw = fx
            .node("operator_assignment", "a ||= 1")
            .child(fx.node("lvar", "a"))
            .leaf("||=")
            .child(fx.node("int", "1"));
        let hits = fx.hits().at("a ||= 1", 4).at("a", 4).at("1", 1).build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);
        assert_eq!(entry.key.kind, BranchKind::Or);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::Then, 3), (BranchLabel::Else, 1)]
        );
        assert_eq!(entry.outcome(BranchLabel::Else).unwrap().span.to_tuple(), [1, 6, 1, 7]);
    }

    #[test]
    fn test_inconsistent_counts_clamp_to_zero() {
        let fx = SourceFixture::new("123 && 45");
        let raw = fx
            .node("and", "123 && 45")
            .child(fx.node("int", "123"))
            .child(fx.node("int", "45"));
        let hits = fx.hits().at("123 && 45", 1).at("123", 1).at("45", 3).build();
        assert_eq!(
            only_entry(&analyse(&raw, &hits)).hits_by_label(),
            vec![(BranchLabel::Then, 3), (BranchLabel::Else, 0)]
        );
    }

    #[test]
    fn test_uninstrumented_operand_falls_back_to_construct() {
        let fx = SourceFixture::new("ok && go");
        let raw = fx
            .node("and", "ok && go")
            .child(fx.node("send", "ok"))
            .child(fx.node("send", "go"));
        let hits = fx.hits().at("ok && go", 2).build();
        assert_eq!(
            only_entry(&analyse(&raw, &hits)).hits_by_label(),
            vec![(BranchLabel::Then, 0), (BranchLabel::Else, 2)]
        );
    }
}

mod safe_navigation_tests {
    use super::*;

    #[test]
    fn test_dispatch_counted_on_selector() {
        let fx = SourceFixture::new("user&.name");
        let raw = RawNode::new("csend")
            .at(Location::new(fx.span("user&.name")).with_selector(fx.span("name")))
            .child(fx.node("lvar", "user"))
            .leaf("name");
        let hits = fx
            .hits()
            .at("user&.name", 3)
            .at("user", 3)
            .at("name", 1)
            .build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);
        assert_eq!(entry.key.kind, BranchKind::SafeNavigation);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::Then, 1), (BranchLabel::Else, 2)]
        );
        assert!(entry.outcomes.iter().all(|o| o.span == entry.key.span));
    }

    #[test]
    fn test_call_with_safe_operator_reclassifies() {
        let fx = SourceFixture::new("user&.name");
        let raw = fx
            .node("call", "user&.name")
            .child(fx.node("lvar", "user"))
            .leaf("&.")
            .leaf("name");
        let hits = fx.hits().at("user&.name", 1).at("user", 1).build();
        let result = analyse(&raw, &hits);
        assert_eq!(only_entry(&result).key.kind, BranchKind::SafeNavigation);
    }
}

mod case_tests {
    use super::*;

    fn when(fx: &SourceFixture, test: &str, body: Option<&str>) -> RawNode {
        let header = format!("when {test}");
        let span = match body {
            Some(body) => fx.span_between(&header, body),
            None => fx.span(&header),
        };
        let node = fx.node_at("when", span).child(fx.node("int", test));
        match body {
            Some(body) => node.child(fx.node("sym", body)),
            None => node.nil(),
        }
    }

    #[test]
    fn test_no_else_has_no_else_label() {
        let fx = SourceFixture::new("case x\nwhen 1\n  :one\nwhen 2\n  :two\nend");
        let raw = fx
            .node_at("case", fx.span_between("case", "end"))
            .child(fx.node("lvar", "x"))
            .child(when(&fx, "1", Some(":one")))
            .child(when(&fx, "2", Some(":two")))
            .nil();
        let hits = fx
            .hits()
            .span(fx.span_between("case", "end"), 1)
            .at("x", 1)
            .at("1", 1)
            .at(":one", 1)
            .build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);

        assert_eq!(entry.key.kind, BranchKind::Case);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::When(0), 1), (BranchLabel::When(1), 0)]
        );
        assert!(entry.outcome(BranchLabel::Else).is_none());
        assert_eq!(entry.outcomes[1].span.to_tuple(), [5, 2, 5, 6]);
    }

    #[test]
    fn test_else_reported_when_present() {
        let fx = SourceFixture::new("case x\nwhen 1\n  :one\nelse\n  :other\nend");
        let raw = fx
            .node_at("case", fx.span_between("case", "end"))
            .child(fx.node("lvar", "x"))
            .child(when(&fx, "1", Some(":one")))
            .child(fx.node("sym", ":other"));
        let hits = fx
            .hits()
            .span(fx.span_between("case", "end"), 2)
            .at("x", 2)
            .at("1", 2)
            .at(":one", 1)
            .at(":other", 1)
            .build();
        assert_eq!(
            only_entry(&analyse(&raw, &hits)).hits_by_label(),
            vec![(BranchLabel::When(0), 1), (BranchLabel::Else, 1)]
        );
    }

    #[test]
    fn test_empty_when_bodies_use_reach_difference() {
        let fx = SourceFixture::new("case x\nwhen 1\nwhen 2\nend");
        let raw = fx
            .node_at("case", fx.span_between("case", "end"))
            .child(fx.node("lvar", "x"))
            .child(when(&fx, "1", None))
            .child(when(&fx, "2", None))
            .nil();
        let hits = fx
            .hits()
            .span(fx.span_between("case", "end"), 3)
            .at("x", 3)
            .at("1", 3)
            .at("2", 1)
            .build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::When(0), 2), (BranchLabel::When(1), 0)]
        );
        assert_eq!(entry.outcomes[0].span.to_tuple(), [2, 0, 2, 6]);
    }
}

mod loop_tests {
    use super::*;

    fn while_loop(fx: &SourceFixture, kind: &str, cond: &str) -> RawNode {
        fx.node_at(kind, fx.span_between(kind, "end"))
            .child(fx.node("send", cond))
            .child(fx.node("op_asgn", "a += 1"))
    }

    #[test]
    fn test_zero_iterations_skip() {
        let fx = SourceFixture::new("while false\n  x\nend");
        let raw = fx
            .node_at("while", fx.span_between("while", "end"))
            .child(fx.node("false", "false"))
            .child(fx.node("send", "x"));
        let hits = fx
            .hits()
            .span(fx.span_between("while", "end"), 1)
            .at("false", 1)
            .build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);
        assert_eq!(entry.key.kind, BranchKind::While);
        assert_eq!(
            entry.hits_by_label(),
            vec![(BranchLabel::Body, 0), (BranchLabel::Skip, 1)]
        );
    }

    #[test]
    fn test_until_matches_while() {
        let fx_while = SourceFixture::new("while a < 3\n  a += 1\nend");
        let fx_until = SourceFixture::new("until !(a < 3)\n  a += 1\nend");
        let while_hits = fx_while
            .hits()
            .span(fx_while.span_between("while", "end"), 1)
            .at("a < 3", 4)
            .at("a += 1", 3)
            .build();
        let until_hits = fx_until
            .hits()
            .span(fx_until.span_between("until", "end"), 1)
            .at("!(a < 3)", 4)
            .at("a += 1", 3)
            .build();

        let a = analyse(&while_loop(&fx_while, "while", "a < 3"), &while_hits);
        let b = analyse(&while_loop(&fx_until, "until", "!(a < 3)"), &until_hits);
        assert_eq!(only_entry(&a).key.kind, only_entry(&b).key.kind);
        assert_eq!(only_entry(&a).hits_by_label(), only_entry(&b).hits_by_label());
        assert_eq!(
            only_entry(&a).hits_by_label(),
            vec![(BranchLabel::Body, 3), (BranchLabel::Skip, 0)]
        );
    }

    #[test]
    fn test_skip_can_be_disabled() {
        let fx = SourceFixture::new("while false\n  x\nend");
        let raw = fx
            .node_at("while", fx.span_between("while", "end"))
            .child(fx.node("false", "false"))
            .child(fx.node("send", "x"));
        let hits = fx.hits().span(fx.span_between("while", "end"), 1).build();
        let config = AnalysisConfig::builder().include_skip(false).build();
        let result = with(config, &raw, &hits);
        assert_eq!(only_entry(&result).hits_by_label(), vec![(BranchLabel::Body, 0)]);
    }

    #[test]
    fn test_empty_body_counts_extra_evaluations() {
        let fx = SourceFixture::new("while step\nend");
        let raw = fx
            .node_at("while", fx.span_between("while", "end"))
            .child(fx.node("send", "step"))
            .nil();
        let hits = fx
            .hits()
            .span(fx.span_between("while", "end"), 1)
            .at("step", 4)
            .build();
        assert_eq!(
            only_entry(&analyse(&raw, &hits)).hits_by_label(),
            vec![(BranchLabel::Body, 3), (BranchLabel::Skip, 0)]
        );
    }

    #[test]
    fn test_skip_is_lower_bound_for_reentered_loop() {
        // entered twice, one entry iterating 3 times and one not at all
        let fx = SourceFixture::new("while a < 3\n  a += 1\nend");
        let hits = fx
            .hits()
            .span(fx.span_between("while", "end"), 2)
            .at("a < 3", 5)
            .at("a += 1", 3)
            .build();
        assert_eq!(
            only_entry(&analyse(&while_loop(&fx, "while", "a < 3"), &hits)).hits_by_label(),
            vec![(BranchLabel::Body, 3), (BranchLabel::Skip, 0)]
        );
    }

    #[test]
    fn test_post_test_loop_has_body_only() {
        let fx = SourceFixture::new("begin\n  a += 1\nend while a < 3");
        let raw = fx
            .node_at("while_post", fx.span_between("begin", "a < 3"))
            .child(fx.node("send", "a < 3"))
            .child(
                fx.node_at("kwbegin", fx.span_between("begin", "end"))
                    .child(fx.node("op_asgn", "a += 1")),
            );
        let hits = fx
            .hits()
            .span(fx.span_between("begin", "a < 3"), 1)
            .at("a += 1", 3)
            .at("a < 3", 3)
            .build();
        let result = analyse(&raw, &hits);
        let entry = only_entry(&result);
        assert_eq!(entry.key.kind, BranchKind::WhilePost);
        assert_eq!(entry.hits_by_label(), vec![(BranchLabel::Body, 3)]);
        assert_eq!(entry.outcomes[0].span.to_tuple(), [1, 0, 3, 3]);
    }

    #[test]
    fn test_empty_post_test_body_runs_once_per_entry() {
        let fx = SourceFixture::new("begin\nend while a < 10");
        let raw = fx
            .node_at("until_post", fx.span_between("begin", "a < 10"))
            .child(fx.node("send", "a < 10"))
            .child(fx.node_at("kwbegin", fx.span_between("begin", "end")));
        let hits = fx
            .hits()
            .span(fx.span_between("begin", "a < 10"), 1)
            .at("a < 10", 1)
            .build();
        assert_eq!(
            only_entry(&analyse(&raw, &hits)).hits_by_label(),
            vec![(BranchLabel::Body, 1)]
        );
    }
}

mod line_tests {
    use super::*;

    fn if_tree(fx: &SourceFixture) -> RawNode {
        fx.node_at("if", fx.span_between("if", "end"))
            .child(fx.node("const", "DeepCover"))
            .child(fx.node("int", "66"))
            .nil()
    }

    #[test]
    fn test_first_line_of_each_node() {
        let fx = SourceFixture::new("if DeepCover\n  66\nend");
        let hits = fx
            .hits()
            .span(fx.span_between("if", "end"), 1)
            .at("DeepCover", 1)
            .build();
        let result = analyse(&if_tree(&fx), &hits);
        assert_eq!(result.lines.iter().collect::<Vec<_>>(), vec![(1, 1), (2, 0)]);
        assert_eq!(result.lines.get(3), None);
    }

    #[test]
    fn test_same_line_is_not_summed() {
        let fx = SourceFixture::new("123 && 45");
        let raw = fx
            .node("and", "123 && 45")
            .child(fx.node("int", "123"))
            .child(fx.node("int", "45"));
        let hits = fx.hits().at("123 && 45", 2).at("123", 2).at("45", 2).build();
        assert_eq!(analyse(&raw, &hits).lines.get(1), Some(2));
    }

    #[test]
    fn test_partial_lines() {
        let fx = SourceFixture::new("false && 45");
        let raw = fx
            .node("and", "false && 45")
            .child(fx.node("false", "false"))
            .child(fx.node("int", "45"));
        let hits = fx.hits().at("false && 45", 1).at("false", 1).build();

        assert_eq!(analyse(&raw, &hits).lines.get(1), Some(1));
        let strict = AnalysisConfig::builder().allow_partial(false).build();
        assert_eq!(with(strict, &raw, &hits).lines.get(1), Some(0));
    }

    #[test]
    fn test_markers_are_not_relevant() {
        let fx = SourceFixture::new("def run(a)\n  a\nend");
        let raw = fx
            .node_at("def", fx.span_between("def", "end"))
            .leaf("run")
            .child(fx.node("args", "(a)"))
            .child(fx.node_nth("lvar", "a", 1));
        let hits = fx.hits().span(fx.span_between("def", "end"), 1).build();
        let result = analyse(&raw, &hits);
        assert_eq!(result.lines.iter().collect::<Vec<_>>(), vec![(1, 1), (2, 0)]);
    }

    #[test]
    fn test_first_line_filters_earlier_lines() {
        let fx = SourceFixture::new("x\ny");
        let raw = fx
            .node_at("begin", fx.span_between("x", "y"))
            .child(fx.node("send", "x"))
            .child(fx.node("send", "y"));
        let hits = fx.hits().at("x", 1).at("y", 1).build();
        let config = AnalysisConfig::builder().first_line(2).build();
        let result = with(config, &raw, &hits);
        assert_eq!(result.lines.iter().collect::<Vec<_>>(), vec![(2, 1)]);
    }
}

mod pipeline_tests {
    use super::*;

    struct Broken;

    impl HitSource for Broken {
        fn hits_for_range(&self, _range: ByteRange) -> Result<Option<u64>, HitSourceError> {
            Err(HitSourceError::Encoding {
                message: "invalid byte sequence in UTF-8".to_string(),
            })
        }

        fn hits_at(&self, _line: u32, _column: u32) -> Result<Option<u64>, HitSourceError> {
            Ok(None)
        }
    }

    fn and_tree(fx: &SourceFixture) -> RawNode {
        fx.node("and", "123 && 45")
            .child(fx.node("int", "123"))
            .child(fx.node("int", "45"))
    }

    #[test]
    fn test_outcome_ids_follow_node_ids() {
        let fx = SourceFixture::new("123 && 45");
        let hits = fx.hits().at("123 && 45", 1).at("123", 1).build();
        let result = analyse(&and_tree(&fx), &hits);
        let entry = only_entry(&result);
        assert_eq!(result.node_count, 3);
        assert_eq!(entry.key.id, NodeId::new(0));
        assert_eq!(entry.outcomes.iter().map(|o| o.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_hit_source_failure_names_unit() {
        let fx = SourceFixture::new("123 && 45");
        let err = Analysis::default()
            .run_unit("lib/a.rb", &and_tree(&fx), &Broken)
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(
            err,
            CovError::HitSource { ref unit, source: HitSourceError::Encoding { .. } } if unit == "lib/a.rb"
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let fx = SourceFixture::new("123 && 45");
        let config = AnalysisConfig::builder().first_line(0).build();
        let err = Analysis::new(config)
            .run(&and_tree(&fx), &fx.hits().build())
            .unwrap_err();
        assert!(matches!(err, CovError::InvalidConfig { .. }));
    }

    #[test]
    fn test_unlocated_constructs_skipped() {
        let fx = SourceFixture::new("123 && 45");
        let raw = RawNode::new("begin")
            .child(
                RawNode::new("if")
                    .child(RawNode::new("true"))
                    .child(RawNode::new("nil"))
                    .nil(),
            )
            .child(and_tree(&fx));
        let hits = fx.hits().at("123 && 45", 1).at("123", 1).build();
        let result = analyse(&raw, &hits);
        assert_eq!(only_entry(&result).key.kind, BranchKind::And);
        assert_eq!(result.node_count, 7);
    }

    #[test]
    fn test_entries_in_post_order() {
        let fx = SourceFixture::new("if a && b\n  c\nend");
        let raw = fx
            .node_at("if", fx.span_between("if", "end"))
            .child(
                fx.node("and", "a && b")
                    .child(fx.node("send", "a"))
                    .child(fx.node("send", "b")),
            )
            .child(fx.node("send", "c"))
            .nil();
        let hits = fx.hits().span(fx.span_between("if", "end"), 1).build();
        let result = analyse(&raw, &hits);
        let kinds: Vec<BranchKind> = result.branches.iter().map(|e| e.key.kind).collect();
        assert_eq!(kinds, vec![BranchKind::And, BranchKind::If]);
        assert!(result.branches.verify_unique().is_ok());
    }
}
