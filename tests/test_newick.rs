use std::path::Path;
use treeannotator::model::AnnotationValue;
use treeannotator::newick::{NewickParser, NewickStyle, parse_file, to_annotated_newick, to_newick};
use treeannotator::parser::byte_parser::ByteParser;

// --- TESTS NEWICK STRING PARSING ---
#[test]
fn test_basic_compact_tree() {
    let newick = "((A:1.0,B:2.0):3.0,C:4.0):0.5;";
    let mut parser = ByteParser::for_str(newick);
    let mut newick_parser = NewickParser::new().with_num_leaves(3);
    let tree = newick_parser.parse_str(&mut parser).unwrap();
    let leaf_map = newick_parser.into_label_storage();

    // Test counts
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.num_internal(), 1);
    assert_eq!(tree.num_vertices(), 5);
    assert_eq!(leaf_map.num_labels(), 3);
    assert!(leaf_map.contains_label("A"));
    assert!(leaf_map.contains_label("C"));

    // - Root has children (internal, C)
    let root = tree.root();
    let root_index = root.index();
    let &[root_left, root_right] = root.children().unwrap() else {
        panic!("expected two children")
    };

    // - Internal node has children (A, B)
    let internal = tree.vertex(root_left);
    assert!(internal.is_internal());
    let &[internal_left, internal_right] = internal.children().unwrap() else {
        panic!("expected two children")
    };

    let leaf_a = tree.vertex(internal_left);
    let leaf_b = tree.vertex(internal_right);
    let leaf_c = tree.vertex(root_right);
    assert_eq!(leaf_map.get_label(*leaf_a.label().unwrap()), Some("A"));
    assert_eq!(leaf_map.get_label(*leaf_b.label().unwrap()), Some("B"));
    assert_eq!(leaf_map.get_label(*leaf_c.label().unwrap()), Some("C"));

    // - Parent relationships
    assert_eq!(internal.parent(), Some(root_index));
    assert_eq!(leaf_a.parent(), Some(root_left));
    assert_eq!(leaf_c.parent(), Some(root_index));
}

#[test]
fn test_heights_from_branch_lengths() {
    let newick = "((A:1.0,B:1.0):3.0,C:4.0);";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .parse_str(&mut parser)
        .unwrap();

    let heights = tree.vertex_heights();
    let &[ab, c] = tree.root().children().unwrap() else {
        panic!("expected two children")
    };
    assert_eq!(heights[tree.root_index()], 4.0);
    assert_eq!(heights[ab], 1.0);
    assert_eq!(heights[c], 0.0);
    assert_eq!(tree.height(), 4.0);
}

#[test]
fn test_tree_with_quoted_labels() {
    let newick = "(('Taxon one':1.5,'Second''s taxon':2.5):3.0,'3rd Taxon':4.0):0.0;";
    let mut parser = ByteParser::for_str(newick);
    let mut newick_parser = NewickParser::new().with_num_leaves(3);
    let tree = newick_parser.parse_str(&mut parser).unwrap();
    let leaf_map = newick_parser.into_label_storage();

    assert_eq!(tree.num_leaves(), 3);
    assert!(leaf_map.contains_label("Taxon one"));
    assert!(leaf_map.contains_label("Second's taxon"));
    assert!(leaf_map.contains_label("3rd Taxon"));
}

#[test]
fn test_tree_with_scientific_notation() {
    let newick = "((A:1e-5,B:2.5E+3):1.0e2,C:3.14E-10):0.0;";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .parse_str(&mut parser)
        .unwrap();
    let &[ab, _] = tree.root().children().unwrap() else {
        panic!("expected two children")
    };
    assert_eq!(*tree.vertex(ab).branch_length().unwrap(), 100.0);
}

#[test]
fn test_optional_branch_length() {
    let newick = "((A:1.0,B),C:4.0);";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new().parse_str(&mut parser).unwrap();
    assert!(!tree.vertices_have_branch_lengths());
}

#[test]
fn test_newick_with_plain_comments() {
    let newick = "[A tree of] ([Shags!] C:[King Commentoran] 2.2, (A[Great Commentoran]:0.33, B[Pied Commentoran]:0.33):1.87):0.0[The end.];";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_annotations()
        .parse_str(&mut parser)
        .unwrap();

    assert_eq!(tree.num_leaves(), 3);
    assert!(tree.annotations().is_empty());
}

#[test]
fn test_annotations_are_parsed_per_vertex() {
    let newick = "((A[&rate=0.5]:1.0,B[&rate=1.5,state=\"Otago\"]:1.0)[&location={-45.9,170.5},fixed=true]:1.0,C:2.0)[&rate=1];";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_annotations()
        .parse_str(&mut parser)
        .unwrap();

    let root = tree.root_index();
    let &[ab, c] = tree.root().children().unwrap() else {
        panic!("expected two children")
    };
    let &[a, b] = tree.vertex(ab).children().unwrap() else {
        panic!("expected two children")
    };
    let annotations = tree.annotations();

    assert_eq!(annotations.get("rate", a).and_then(|v| v.as_f64()), Some(0.5));
    assert_eq!(annotations.get("rate", root).and_then(|v| v.as_f64()), Some(1.0));
    assert_eq!(annotations.get("rate", c), None);
    assert_eq!(annotations.get("state", b), Some(&AnnotationValue::from("Otago")));
    assert_eq!(annotations.get("fixed", ab), Some(&AnnotationValue::Bool(true)));
    assert_eq!(
        annotations.get("location", ab),
        Some(&AnnotationValue::from(vec![-45.9, 170.5]))
    );
}

#[test]
fn test_annotations_ignored_by_default() {
    let newick = "(A[&rate=0.5]:1.0,B:1.0);";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new().parse_str(&mut parser).unwrap();
    assert!(tree.annotations().is_empty());
}

#[test]
fn test_polytomy() {
    let newick = "(A:1.0,B:1.0,(C:0.5,D:0.5,E:0.5):0.5);";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .parse_str(&mut parser)
        .unwrap();
    assert!(tree.is_valid());
    assert_eq!(tree.num_leaves(), 5);
    assert_eq!(tree.num_internal(), 1);

    let children = tree.root().children().unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(tree.vertex(children[2]).children().unwrap().len(), 3);
    assert_eq!(tree.vertex_heights()[children[2]], 0.5);
}

#[test]
fn test_single_child_is_rejected() {
    let mut parser = ByteParser::for_str("((A:1.0):1.0,B:2.0);");
    let tree = NewickParser::new().parse_str(&mut parser);
    assert!(tree.is_err());
}

// --- TESTS DEALING WITH CORRUPT NEWICK STRINGS ---

#[test]
fn test_missing_semicolon() {
    let newick = "((A:1.0,B:2.0):3.0,C:4.0):0.5";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_num_leaves(3)
        .parse_str(&mut parser);
    assert!(tree.is_err());
}

#[test]
fn test_missing_comma() {
    let newick = "((A:1.0 B:2.0):3.0,C:4.0):0.5;";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_num_leaves(3)
        .parse_str(&mut parser);
    assert!(tree.is_err());
}

#[test]
fn test_unmatched_parentheses() {
    let newick = "((A:1.0,B:2.0:3.0,C:4.0):0.5;";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_num_leaves(3)
        .parse_str(&mut parser);
    assert!(tree.is_err());
}

#[test]
fn test_invalid_branch_length() {
    let newick = "((A:1.0,B:abc):3.0,C:4.0):0.5;";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_num_leaves(3)
        .parse_str(&mut parser);
    assert!(tree.is_err());
}

#[test]
fn test_unterminated_annotation() {
    let newick = "(A[&rate=0.5:1.0,B:1.0);";
    let mut parser = ByteParser::for_str(newick);
    let tree = NewickParser::new()
        .with_annotations()
        .parse_str(&mut parser);
    assert!(tree.is_err());
}

// --- TESTS PARSING WHOLE FILE ---
#[test]
fn test_parsing_newick_file() {
    let path = Path::new("tests").join("fixtures").join("kiwi_t5_n4.nwk");
    let (trees, leaf_map) = parse_file(path).unwrap();

    assert_eq!(trees.len(), 5);
    assert_eq!(leaf_map.num_labels(), 4);
    assert!(leaf_map.contains_label("Dinornis_robustus"));

    for tree in &trees {
        assert_eq!(tree.num_leaves(), 4);
        assert!(tree.is_valid());
        assert!(tree.annotations().contains_key("rate"));
    }
}

// --- TESTS WRITING ---
#[test]
fn test_write_round_trips_labels_and_annotations() {
    let newick = "((A:1,B:1)[&rate=2]:1,C:2);";
    let mut byte_parser = ByteParser::for_str(newick);
    let mut newick_parser = NewickParser::new().with_annotations();
    let tree = newick_parser.parse_str(&mut byte_parser).unwrap();
    let leaf_map = newick_parser.into_label_storage();

    assert_eq!(to_newick(&NewickStyle::Label, &tree, Some(&leaf_map)), "((A:1,B:1):1,C:2);");
    assert_eq!(
        to_annotated_newick(&NewickStyle::Label, &tree, Some(&leaf_map)),
        "((A:1,B:1)[&rate=2]:1,C:2);"
    );
}
