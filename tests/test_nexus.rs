use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use treeannotator::newick::{NewickStyle, to_newick};
use treeannotator::nexus::{Burnin, NexusParserBuilder, NexusWriter};
use treeannotator::parse_nexus_file;

fn fixture() -> PathBuf {
    Path::new("tests").join("fixtures").join("kiwi_t5_n4.trees")
}

fn nexus_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_translated_trees_with_annotations() {
    let (trees, leaf_map) = parse_nexus_file(fixture()).unwrap();
    assert_eq!(trees.len(), 5);
    assert_eq!(leaf_map.num_labels(), 4);
    assert_eq!(leaf_map.get_index("Apteryx_australis"), Some(0));
    assert_eq!(leaf_map.get_index("Dinornis_robustus"), Some(3));

    for tree in &trees {
        assert_eq!(tree.num_leaves(), 4);
        assert!(tree.is_valid());
    }

    let second = &trees[1];
    assert_eq!(second.name().map(String::as_str), Some("STATE_1000"));
    assert_eq!(
        to_newick(&NewickStyle::Label, second, Some(&leaf_map)),
        "((Apteryx_australis:1,Apteryx_haastii:1):1,(Apteryx_owenii:0.5,Dinornis_robustus:0.5):1.5);"
    );
    let root = second.root_index();
    assert_eq!(
        second.annotations().get("state", root),
        Some(&"north".into())
    );
}

#[test]
fn test_without_taxa_block() {
    let file = nexus_file(
        "#NEXUS\nBegin trees;\n\tTranslate\n\t\t1 Tui,\n\t\t2 Kaka,\n\t\t3 Kea\n\t\t;\n\
         tree t1 = [&R] ((1:1,2:1):1,3:2);\ntree t2 = [&R] ((1:1,3:1):1,2:2);\nEnd;\n",
    );
    let (trees, leaf_map) = parse_nexus_file(file.path()).unwrap();
    assert_eq!(trees.len(), 2);
    assert_eq!(leaf_map.num_labels(), 3);
    assert!(leaf_map.contains_label("Kea"));
}

#[test]
fn test_comments_and_unknown_blocks() {
    let file = nexus_file(
        "#NEXUS\n[written by hand]\nBegin taxa;\n\tDimensions ntax=3;\n\tTaxlabels Tui Kaka Kea;\nEnd;\n\
         Begin assumptions; [nothing to see] End;\n\
         Begin trees;\n[first] tree t1 [&lnP=-10.0] = [&R] ((Tui:1,Kaka:1):1,Kea:2);\nEnd;\n",
    );
    let (trees, leaf_map) = parse_nexus_file(file.path()).unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(leaf_map.labels(), ["Tui", "Kaka", "Kea"]);
}

#[test]
fn test_missing_trees_block_is_an_error() {
    let file = nexus_file("#NEXUS\nBegin taxa;\n\tDimensions ntax=2;\n\tTaxlabels Tui Kea;\nEnd;\n");
    assert!(parse_nexus_file(file.path()).is_err());
}

#[test]
fn test_not_nexus_is_an_error() {
    let file = nexus_file("((A,B),C);\n");
    assert!(parse_nexus_file(file.path()).is_err());
}

#[test]
fn test_burnin_count() {
    let parser = NexusParserBuilder::for_file(fixture())
        .with_burnin(Burnin::Count(2))
        .build()
        .unwrap();

    assert_eq!(parser.num_trees(), 3);
    assert_eq!(parser.num_total_trees(), 5);
    assert_eq!(parser.num_burnin_trees(), 2);

    let (trees, _) = parser.into_results().unwrap();
    assert_eq!(trees.len(), 3);
    assert_eq!(trees[0].name().map(String::as_str), Some("STATE_2000"));
}

#[test]
fn test_burnin_percentage() {
    // 25% of 5 trees = 1.25 -> floor to 1
    let parser = NexusParserBuilder::for_file(fixture())
        .with_burnin(Burnin::Percentage(0.25))
        .build()
        .unwrap();

    assert_eq!(parser.num_trees(), 4);
    assert_eq!(parser.num_total_trees(), 5);
}

#[test]
fn test_reset_with_burnin() {
    for buffered in [false, true] {
        let builder = NexusParserBuilder::for_file(fixture()).with_burnin(Burnin::Count(1));
        let builder = if buffered {
            builder.with_buffered_source()
        } else {
            builder.with_in_memory_source()
        };
        let mut parser = builder.build().unwrap();

        let first_tree = parser.next_tree().unwrap().unwrap();
        let mut count = 1;
        while parser.next_tree().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);

        parser.reset();
        let first_tree_again = parser.next_tree().unwrap().unwrap();
        assert_eq!(
            to_newick(&NewickStyle::ZeroIndexed, &first_tree, None),
            to_newick(&NewickStyle::ZeroIndexed, &first_tree_again, None)
        );
    }
}

#[test]
fn test_annotations_skipped_unless_enabled() {
    let mut parser = NexusParserBuilder::for_file(fixture()).build().unwrap();
    let tree = parser.next_tree().unwrap().unwrap();
    assert!(tree.annotations().is_empty());
}

#[test]
fn test_written_nexus_parses_again() {
    let (trees, leaf_map) = parse_nexus_file(fixture()).unwrap();
    let mut out = NamedTempFile::new().unwrap();
    NexusWriter::new(out.as_file_mut())
        .write_annotated_nexus(&trees[1..3], &leaf_map)
        .unwrap();

    let (reread, reread_map) = parse_nexus_file(out.path()).unwrap();
    assert_eq!(reread.len(), 2);
    assert_eq!(reread_map, leaf_map);
    for (original, again) in trees[1..3].iter().zip(&reread) {
        assert_eq!(
            to_newick(&NewickStyle::ZeroIndexed, original, None),
            to_newick(&NewickStyle::ZeroIndexed, again, None)
        );
        assert_eq!(
            again.annotations().get("rate", again.root_index()),
            original.annotations().get("rate", original.root_index())
        );
    }
}
