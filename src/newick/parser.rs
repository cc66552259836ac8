//! Structs and logic to parse Newick strings.
//!
//! This module provides the [NewickParser] struct, which offers methods
//! to parse all trees of a source, single strings, or one tree after
//! another.

use crate::model::annotation::AnnotationValue;
use crate::model::{CompactTree, CompactTreeBuilder, LabelResolver, LeafLabelMap, VertexIndex};
use crate::newick::defs::{
    ANNOTATION_KEY_DELIMITERS, ANNOTATION_VALUE_DELIMITERS, DEFAULT_NUM_LEAVES_GUESS,
    NEWICK_LABEL_DELIMITERS,
};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;

/// Annotations of one vertex in the order they were written
type ParsedAnnotations = Vec<(String, AnnotationValue)>;

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================$=
/// Parser (configuration) for single/multiple Newick format phylogenetic
/// trees.
///
/// Builds [CompactTree]s with a [CompactTreeBuilder]. Uses a [LabelResolver]
/// (which in turn fills a [LeafLabelMap]) to resolve any mapping, e.g. as
/// necessary when parsing a Nexus file with a `TRANSLATE` command.
///
/// # Configuration
/// * [`with_num_leaves(num_leaves)`](Self::with_num_leaves)
///     - Can be configured with number of leaves in trees to parse,
///       otherwise it is inferred from the first parsed tree and then stored.
/// * [`with_annotations()`](Self::with_annotations)
///     - Parses vertex annotations (e.g. `[&rate=0.5,state="Otago"]`)
///       instead of treating them as comments.
/// * [`with_frozen_labels()`](Self::with_frozen_labels)
///     - Rejects labels not seen so far.
///
/// # Parsing
/// * [`parse_str`](Self::parse_str) — Parse single tree
/// * [`parse_all`](Self::parse_all) — Parse all trees eagerly
/// * [`parse_next`](Self::parse_next) — Parse one tree after another
///
/// # Example
/// ```
/// use treeannotator::newick::NewickParser;
/// use treeannotator::parser::ByteParser;
///
/// let input = "((A_meleagrides:1.0,A_vulturinum:1.0)[&rate=0.1]:0.5,\
///               (N_meleagris:1.0,G_plumifera:1.0):0.5);";
/// let mut byte_parser = ByteParser::for_str(input);
/// let mut newick_parser = NewickParser::new().with_annotations();
///
/// let tree = newick_parser.parse_str(&mut byte_parser).unwrap();
/// assert_eq!(tree.num_leaves(), 4);
/// assert_eq!(tree.annotations().keys(), ["rate"]);
/// ```
pub struct NewickParser {
    know_num_leaves: bool,
    num_leaves: usize,
    tree_builder: CompactTreeBuilder,
    resolver: LabelResolver,
    parse_annotations: bool,
}

// ============================================================================
// Construction & Configuration, Deconstruction (pub)
// ============================================================================
impl NewickParser {
    /// Creates a new [NewickParser] with default settings:
    /// - Number of leaves is unknown (will be counted during parsing)
    /// - Verbatim label resolution
    /// - Annotations are skipped as comments
    pub fn new() -> Self {
        let storage = LeafLabelMap::with_capacity(DEFAULT_NUM_LEAVES_GUESS);
        Self {
            know_num_leaves: false,
            num_leaves: DEFAULT_NUM_LEAVES_GUESS,
            tree_builder: CompactTreeBuilder::new(),
            resolver: LabelResolver::new_verbatim_labels_resolver(storage),
            parse_annotations: false,
        }
    }

    /// Sets the expected number of leaves in each parsed tree.
    ///
    /// This allows pre-allocation of data structures for better performance.
    /// If not set, the parser will count leaves during parsing.
    pub fn with_num_leaves(mut self, num_leaves: usize) -> Self {
        self.set_num_leaves(num_leaves);
        self
    }

    pub(crate) fn set_num_leaves(&mut self, num_leaves: usize) -> &mut Self {
        self.num_leaves = num_leaves;
        self.know_num_leaves = true;
        self
    }

    pub(crate) fn set_resolver(&mut self, resolver: LabelResolver) -> &mut Self {
        self.resolver = resolver;
        self
    }

    /// Configures the parser to parse vertex annotations.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    pub(crate) fn set_parse_annotations(&mut self, parse_annotations: bool) -> &mut Self {
        self.parse_annotations = parse_annotations;
        self
    }

    /// Freezes the labels seen so far: from now on, an unknown label is a
    /// [ParsingError] instead of a new taxon.
    pub fn with_frozen_labels(mut self) -> Self {
        self.resolver = self.resolver.freeze();
        self
    }

    /// Consumes the parser and returns the [LeafLabelMap] of all labels
    /// seen, to be called after all trees have been parsed.
    pub fn into_label_storage(self) -> LeafLabelMap {
        self.resolver.into_label_storage()
    }

    /// Get ref to the [LeafLabelMap] of underlying [LabelResolver]
    pub fn label_storage(&self) -> &LeafLabelMap {
        self.resolver.label_storage()
    }
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// API Parsing (pub)
// ============================================================================
impl NewickParser {
    /// Parses all Newick trees from the byte source until EOF.
    pub fn parse_all<B: ByteSource>(
        &mut self,
        mut byte_parser: ByteParser<B>,
    ) -> Result<Vec<CompactTree>, ParsingError> {
        let mut trees = Vec::new();
        while let Some(tree) = self.parse_next(&mut byte_parser)? {
            trees.push(tree);
        }
        Ok(trees)
    }

    /// Parses the next tree, skipping leading whitespace and comments.
    ///
    /// # Returns
    /// * `Ok(Some(tree))` - The next tree
    /// * `Ok(None)` - Only whitespace and comments were left
    pub fn parse_next<B: ByteSource>(
        &mut self,
        byte_parser: &mut ByteParser<B>,
    ) -> Result<Option<CompactTree>, ParsingError> {
        byte_parser.skip_comment_and_whitespace()?;
        if byte_parser.is_eof() {
            return Ok(None);
        }
        self.parse_str(byte_parser).map(Some)
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Arguments
    /// * `parser` - The byte parser positioned at the start of a Newick tree string
    pub fn parse_str<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<CompactTree, ParsingError> {
        self.parse_str_and_name(parser, None)
    }

    /// Parses a single Newick tree from the given [ByteParser]
    /// and gives it the provided name.
    pub(crate) fn parse_str_and_name<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        tree_name: Option<String>,
    ) -> Result<CompactTree, ParsingError> {
        self.tree_builder.init_next(self.num_leaves);

        if let Some(name) = tree_name {
            self.tree_builder.set_name(name);
        }

        // If number of leaves not known yet, count them in this tree
        if !self.know_num_leaves {
            self.num_leaves = 0;
        }

        self.parse_root(parser)?;
        self.know_num_leaves = true;

        self.tree_builder.finish_tree().ok_or_else(|| {
            ParsingError::invalid_newick_string(parser, "Tree could not be completed".to_string())
        })
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl NewickParser {
    /// Parses root of tree and adds it to tree:
    /// - `(child,child[,...])[annotations][:branch_length][annotations];`
    fn parse_root<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<(), ParsingError> {
        parser.skip_comment_and_whitespace()?;

        let children = self.parse_children(parser)?;
        let (branch_length, annotations) = self.parse_vertex_suffix(parser)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", next_char),
            ));
        }

        let root_index = self.tree_builder.add_root(children, branch_length);
        self.add_annotations(annotations, root_index);

        Ok(())
    }

    /// Parses a vertex (either internal vertex or leaf) and returns its index.
    fn parse_vertex<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<VertexIndex, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.peek_is(b'(') {
            self.parse_internal_vertex(parser)
        } else {
            self.parse_leaf(parser)
        }
    }

    /// Parses internal vertex `(child,child[,...])[annotations][:branch_length]`,
    /// adds it to tree, and returns its index.
    fn parse_internal_vertex<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<VertexIndex, ParsingError> {
        let children = self.parse_children(parser)?;
        let (branch_length, annotations) = self.parse_vertex_suffix(parser)?;
        let index = self.tree_builder.add_internal(children, branch_length);
        self.add_annotations(annotations, index);

        Ok(index)
    }

    /// Parses children `(child,child[,...])` and returns their indices in
    /// input order.
    ///
    /// Expects parser at opening `(`. A single child is rejected, as a
    /// vertex with one child has no clade of its own.
    fn parse_children<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<Vec<VertexIndex>, ParsingError> {
        if !parser.consume_if(b'(') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected '(' before children but found {:?}", next_char),
            ));
        }

        let mut children = vec![self.parse_vertex(parser)?];
        loop {
            parser.skip_comment_and_whitespace()?;
            if parser.consume_if(b')') {
                break;
            }
            if !parser.consume_if(b',') {
                let next_char = parser.peek().map(char::from);
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected ',' or ')' after child but found {:?}", next_char),
                ));
            }
            children.push(self.parse_vertex(parser)?);
        }

        if children.len() < 2 {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Vertex with a single child".to_string(),
            ));
        }
        Ok(children)
    }

    /// Parses leaf vertex `label[annotations][:branch_length]` and adds it
    /// to tree.
    fn parse_leaf<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<VertexIndex, ParsingError> {
        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        if label.is_empty() {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Leaf without label".to_string(),
            ));
        }
        let label_ref = self
            .resolver
            .resolve_label(&label)
            .map_err(|e| ParsingError::unresolved_label(parser, e.to_string()))?;
        let (branch_length, annotations) = self.parse_vertex_suffix(parser)?;
        if !self.know_num_leaves {
            self.num_leaves += 1;
        }

        let leaf_index = self.tree_builder.add_leaf(branch_length, label_ref);
        self.add_annotations(annotations, leaf_index);

        Ok(leaf_index)
    }

    /// Parses what may follow a label or closing parenthesis: annotation
    /// blocks before and/or after an optional branch length.
    fn parse_vertex_suffix<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<(Option<f64>, ParsedAnnotations), ParsingError> {
        let mut annotations = Vec::new();
        self.parse_annotation_blocks(parser, &mut annotations)?;
        let branch_length = self.parse_branch_length(parser)?;
        if branch_length.is_some() {
            self.parse_annotation_blocks(parser, &mut annotations)?;
        }
        Ok((branch_length, annotations))
    }

    /// Skips whitespace and comments, collecting the contents of annotation
    /// blocks if annotations are parsed.
    fn parse_annotation_blocks<B: ByteSource>(
        &self,
        parser: &mut ByteParser<B>,
        annotations: &mut ParsedAnnotations,
    ) -> Result<(), ParsingError> {
        if !self.parse_annotations {
            return parser.skip_comment_and_whitespace();
        }

        parser.skip_plain_comments_and_whitespace()?;
        while parser.peek_is_annotation() {
            parse_annotation_block(parser, annotations)?;
            parser.skip_plain_comments_and_whitespace()?;
        }
        Ok(())
    }

    /// Parses optional branch length `[:number]`:
    /// - Skips comments/whitespace after `:`
    /// - Supports scientific notation (e.g., `1.5e-10`)
    /// - Negative or non-finite values are errors
    fn parse_branch_length<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<Option<f64>, ParsingError> {
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_comment_and_whitespace()?;

        let mut branch_length_str = String::new();
        while let Some(b) = parser.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                branch_length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        let value: f64 = branch_length_str.parse().map_err(|_| {
            ParsingError::invalid_newick_string(
                parser,
                format!("Invalid branch length: {}", branch_length_str),
            )
        })?;
        if !(value >= 0.0 && value.is_finite()) {
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Negative or non-finite branch length: {}", branch_length_str),
            ));
        }
        Ok(Some(value))
    }

    /// Passes parsed annotations on to the [CompactTreeBuilder].
    fn add_annotations(&mut self, annotations: ParsedAnnotations, vertex_index: VertexIndex) {
        for (key, value) in annotations {
            self.tree_builder.add_annotation(vertex_index, key, value);
        }
    }
}

// ============================================================================
// Annotations
// ============================================================================
/// Parses an annotation block `[&key=value,...]` into `annotations`.
///
/// Expects the parser at `[&`. Values are numbers, booleans, quoted or bare
/// strings, or brace-delimited (nested) lists. A key without `=` (as in
/// `[&R]`) is read as `true`.
pub(crate) fn parse_annotation_block<B: ByteSource>(
    parser: &mut ByteParser<B>,
    annotations: &mut ParsedAnnotations,
) -> Result<(), ParsingError> {
    parser.consume_if_sequence(b"[&");

    loop {
        parser.skip_whitespace();
        if parser.consume_if(b']') {
            return Ok(());
        }

        let key = match parser.peek() {
            Some(b'"') => parser.parse_double_quoted()?,
            Some(b'\'') => parser.parse_quoted_label()?,
            _ => parser
                .parse_unquoted_label(ANNOTATION_KEY_DELIMITERS)?
                .trim()
                .to_string(),
        };
        if key.is_empty() {
            return Err(ParsingError::invalid_annotation(
                parser,
                "Empty annotation key".to_string(),
            ));
        }

        parser.skip_whitespace();
        let value = if parser.consume_if(b'=') {
            parser.skip_whitespace();
            parse_annotation_value(parser)?
        } else {
            AnnotationValue::Bool(true)
        };
        annotations.push((key, value));

        parser.skip_whitespace();
        match parser.next_byte() {
            Some(b',') => continue,
            Some(b']') => return Ok(()),
            Some(b) => {
                return Err(ParsingError::invalid_annotation(
                    parser,
                    format!("Expected ',' or ']' in annotation but found '{}'", b as char),
                ));
            }
            None => return Err(ParsingError::unexpected_eof(parser)),
        }
    }
}

/// Parses a single annotation value; see [parse_annotation_block].
fn parse_annotation_value<B: ByteSource>(
    parser: &mut ByteParser<B>,
) -> Result<AnnotationValue, ParsingError> {
    match parser.peek() {
        Some(b'{') => {
            parser.next_byte();
            let mut values = Vec::new();
            loop {
                parser.skip_whitespace();
                if parser.consume_if(b'}') {
                    break;
                }
                values.push(parse_annotation_value(parser)?);
                parser.skip_whitespace();
                match parser.next_byte() {
                    Some(b',') => continue,
                    Some(b'}') => break,
                    Some(b) => {
                        return Err(ParsingError::invalid_annotation(
                            parser,
                            format!("Expected ',' or '}}' in list but found '{}'", b as char),
                        ));
                    }
                    None => return Err(ParsingError::unexpected_eof(parser)),
                }
            }
            Ok(AnnotationValue::Array(values))
        }
        Some(b'"') => Ok(AnnotationValue::String(parser.parse_double_quoted()?)),
        Some(b'\'') => Ok(AnnotationValue::String(parser.parse_quoted_label()?)),
        Some(_) => {
            let token = parser.parse_unquoted_label(ANNOTATION_VALUE_DELIMITERS)?;
            let token = token.trim();
            if token.is_empty() {
                return Err(ParsingError::invalid_annotation(
                    parser,
                    "Empty annotation value".to_string(),
                ));
            }
            Ok(AnnotationValue::from_token(token))
        }
        None => Err(ParsingError::unexpected_eof(parser)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsingErrorType;

    fn parse(input: &str) -> Result<crate::model::CompactTree, ParsingError> {
        let mut parser = NewickParser::new().with_annotations();
        parser.parse_str(&mut ByteParser::for_str(input))
    }

    #[test]
    fn annotations_before_and_after_branch_length() {
        let tree = parse("(A[&rate=0.5]:1.0[&state=\"Otago\"],B:1.0)[&posterior=1];").unwrap();
        let annotations = tree.annotations();
        assert_eq!(annotations.keys(), ["rate", "state", "posterior"]);
        assert_eq!(annotations.get("rate", 0), Some(&AnnotationValue::Float(0.5)));
        assert_eq!(annotations.get("state", 0), Some(&"Otago".into()));
        assert_eq!(
            annotations.get("posterior", tree.root_index()),
            Some(&AnnotationValue::Int(1))
        );
    }

    #[test]
    fn nested_arrays_and_bare_strings() {
        let tree = parse("(A[&loc={-41.3,174.8},set={{1,2},{3}},colour=blue,flag],B);").unwrap();
        let annotations = tree.annotations();
        assert_eq!(
            annotations.get("loc", 0),
            Some(&AnnotationValue::from(vec![-41.3, 174.8]))
        );
        assert_eq!(
            annotations.get("set", 0),
            Some(&AnnotationValue::Array(vec![
                AnnotationValue::Array(vec![1i64.into(), 2i64.into()]),
                AnnotationValue::Array(vec![3i64.into()]),
            ]))
        );
        assert_eq!(annotations.get("colour", 0), Some(&"blue".into()));
        assert_eq!(annotations.get("flag", 0), Some(&AnnotationValue::Bool(true)));
    }

    #[test]
    fn annotations_skipped_unless_enabled() {
        let mut parser = NewickParser::new();
        let tree = parser
            .parse_str(&mut ByteParser::for_str("(A[&rate=0.5]:1,B[plain]:2);"))
            .unwrap();
        assert!(tree.annotations().is_empty());
        assert_eq!(*tree[1].branch_length().unwrap(), 2.0);
    }

    #[test]
    fn negative_branch_length_is_an_error() {
        let err = parse("(A:-1.0,B:1.0);").unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::InvalidNewickString(_)));
    }

    #[test]
    fn vertices_with_more_than_two_children() {
        let tree = parse("((A:1,B:1,C:1)[&rate=0.2]:1,D:2,E:2);").unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.num_leaves(), 5);
        assert_eq!(tree.root().children().map(<[_]>::len), Some(3));
        let abc = tree.root().children().unwrap()[0];
        assert_eq!(tree[abc].children(), Some(&[0, 1, 2][..]));
        assert_eq!(
            tree.annotations().get("rate", abc),
            Some(&AnnotationValue::Float(0.2))
        );
    }

    #[test]
    fn single_child_is_an_error() {
        let err = parse("((A),B);").unwrap_err();
        assert!(matches!(
            err.kind(),
            ParsingErrorType::InvalidNewickString(msg) if msg.contains("single child")
        ));
    }

    #[test]
    fn unclosed_annotation_is_an_error() {
        assert!(parse("(A[&rate=0.5,B);").is_err());
    }

    #[test]
    fn frozen_labels_reject_new_taxa() {
        let mut parser = NewickParser::new();
        let mut bytes = ByteParser::for_str("(A,B);(B,A);(A,C);");
        parser.parse_str(&mut bytes).unwrap();
        let mut parser = parser.with_frozen_labels();
        assert!(parser.parse_next(&mut bytes).unwrap().is_some());
        let err = parser.parse_next(&mut bytes).unwrap_err();
        assert!(matches!(err.kind(), ParsingErrorType::UnresolvedLabel(_)));
    }
}
