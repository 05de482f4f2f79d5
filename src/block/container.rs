use crate::block::{next_line_matches, BlockParser, BlockProcessor};
use crate::context::ParseContext;
use crate::doc::{NodeId, NodeKind};
use crate::readers::{BlockQuoteReader, LineRead, ListItemReader, ListMarkers};
use crate::util::patterns::Pattern;
use crate::util::text::is_blank;
use crate::Error;
use lazy_static::lazy_static;

lazy_static! {
    static ref BLOCK_QUOTE: Pattern = Pattern::new(r"^ {0,3}> ?");

    static ref BULLET_MARKERS: ListMarkers = ListMarkers::new(r"[-+*]", r"^( *[-+*])([ \t]+.*|\n?$)");
    static ref BULLET_LIST: Pattern = Pattern::new(r"^( {0,3}[-+*])([ \t]+.*|\n?$)");
    static ref NON_EMPTY_BULLET_LIST: Pattern = Pattern::new(r"^ {0,3}[-+*][ \t]+\S");

    static ref ORDERED_MARKERS: ListMarkers =
        ListMarkers::new(r"[0-9]{1,9}[.)]", r"^( *[0-9]{1,9}[.)])([ \t]+.*|\n?$)");
    static ref ORDERED_LIST: Pattern = Pattern::new(r"^( {0,3}[0-9]{1,9}[.)])([ \t]+.*|\n?$)");
    static ref ONE_BASED_ORDERED_LIST: Pattern = Pattern::new(r"^ {0,3}1[.)][ \t]+\S");
}

/// `> quoted`. The quote's content is parsed as blocks, recursively.
pub struct BlockQuoteProcessor;

impl BlockProcessor for BlockQuoteProcessor {
    fn name(&self) -> &'static str {
        "BlockQuoteProcessor"
    }

    fn paragraph_interruptable(&self) -> bool {
        true
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, &BLOCK_QUOTE)
    }

    fn run(
        &self,
        parser: &BlockParser,
        reader: &mut dyn LineRead,
        ctx: &mut ParseContext,
        parent: NodeId,
    ) -> Result<bool, Error> {
        let quote = ctx.doc.create_at(NodeKind::BlockQuote, reader.lineno() + 1);
        ctx.doc.append(parent, quote);
        parser.parse(&mut BlockQuoteReader::new(reader), ctx, quote)?;
        Ok(true)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListFamily {
    Bullet,
    Ordered,
}

/// A bullet or ordered list.
///
/// There are four of these. The plain ones start a list anywhere a block can start. The other two only differ in that
/// they can interrupt a paragraph, which CommonMark allows only for lists whose first item has content (and, for
/// ordered lists, starts at 1).
pub struct ListProcessor {
    name: &'static str,
    family: ListFamily,
    first_item: &'static Pattern,
    interruptable: bool,
}

impl ListProcessor {
    pub fn bullet() -> Self {
        Self {
            name: "BulletListProcessor",
            family: ListFamily::Bullet,
            first_item: &BULLET_LIST,
            interruptable: false,
        }
    }

    pub fn non_empty_bullet() -> Self {
        Self {
            name: "NonEmptyBulletListProcessor",
            family: ListFamily::Bullet,
            first_item: &NON_EMPTY_BULLET_LIST,
            interruptable: true,
        }
    }

    pub fn ordered() -> Self {
        Self {
            name: "OrderedListProcessor",
            family: ListFamily::Ordered,
            first_item: &ORDERED_LIST,
            interruptable: false,
        }
    }

    pub fn one_based_ordered() -> Self {
        Self {
            name: "OneBasedOrderedListProcessor",
            family: ListFamily::Ordered,
            first_item: &ONE_BASED_ORDERED_LIST,
            interruptable: true,
        }
    }

    fn markers(&self) -> &'static ListMarkers {
        match self.family {
            ListFamily::Bullet => &BULLET_MARKERS,
            ListFamily::Ordered => &ORDERED_MARKERS,
        }
    }

    fn list_kind(&self, marker: &str) -> NodeKind {
        match self.family {
            ListFamily::Bullet => NodeKind::BulletList {
                bullet: marker.chars().next().unwrap_or('-'),
                tight: None,
            },
            ListFamily::Ordered => {
                let (number, suffix) = marker.split_at(marker.len().saturating_sub(1));
                NodeKind::EnumeratedList {
                    start: number.parse().unwrap_or(1),
                    suffix: suffix.chars().next().unwrap_or('.'),
                    tight: None,
                }
            }
        }
    }

    /// Whether the reader's next line starts another item of a list whose previous item had `marker`.
    ///
    /// Bullet items need the same bullet char; ordered items need the same delimiter (`.` or `)`), and any number.
    fn is_next_list_item(&self, reader: &dyn LineRead, marker: &str) -> bool {
        let Ok(next) = reader.next_line() else {
            return false;
        };
        if self.family == ListFamily::Bullet && is_thematic_break_of(&next, marker) {
            return false;
        }
        let Some(captures) = self.markers().next_item.captures(&next) else {
            return false;
        };
        let candidate = captures.get(1).map_or("", |m| m.as_str()).trim();
        match self.family {
            ListFamily::Bullet => candidate == marker,
            ListFamily::Ordered => candidate.chars().last() == marker.chars().last(),
        }
    }
}

/// Whether `line` is a thematic break made of `marker` chars, which ends a list of those bullets rather than starting
/// a new item.
fn is_thematic_break_of(line: &str, marker: &str) -> bool {
    let Some(bullet) = marker.chars().next() else {
        return false;
    };
    let mut count = 0;
    for ch in line.chars().filter(|c| !c.is_whitespace()) {
        if ch != bullet {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// Appends a [`NodeKind::BlankLine`] for each blank line at the front of the reader. Returns how many there were.
fn consume_blank_lines(reader: &mut dyn LineRead, ctx: &mut ParseContext, item: NodeId) -> usize {
    let mut count = 0;
    while reader.next_line().map_or(false, |line| is_blank(&line)) {
        reader.step(1);
        let blank = ctx.doc.create_at(NodeKind::BlankLine, reader.lineno());
        ctx.doc.append(item, blank);
        count += 1;
    }
    count
}

impl BlockProcessor for ListProcessor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn paragraph_interruptable(&self) -> bool {
        self.interruptable
    }

    fn matches(&self, reader: &dyn LineRead) -> bool {
        next_line_matches(reader, self.first_item)
    }

    fn run(
        &self,
        parser: &BlockParser,
        reader: &mut dyn LineRead,
        ctx: &mut ParseContext,
        parent: NodeId,
    ) -> Result<bool, Error> {
        let list_line = reader.lineno() + 1;
        let Ok(first_marker) = ListItemReader::new(&mut *reader, self.markers()).map(|r| r.marker().to_string()) else {
            return Ok(false);
        };
        let list = ctx.doc.create_at(self.list_kind(&first_marker), list_line);
        ctx.doc.append(parent, list);

        loop {
            let item_line = reader.lineno() + 1;
            let Ok(mut item_reader) = ListItemReader::new(&mut *reader, self.markers()) else {
                break;
            };
            let item = ctx.doc.create_at(NodeKind::ListItem, item_line);
            ctx.doc.append(list, item);

            // an item can start with at most one blank line
            if consume_blank_lines(&mut item_reader, ctx, item) < 2 {
                parser.parse(&mut item_reader, ctx, item)?;
            }
            let marker = item_reader.marker().to_string();
            if !self.is_next_list_item(reader, &marker) {
                break;
            }
        }

        // blank lines after the last item belong after the list
        if let Some(last_item) = ctx.doc.last_child(list) {
            let trailing: Vec<NodeId> = ctx
                .doc
                .children(last_item)
                .iter()
                .rev()
                .take_while(|&&c| matches!(ctx.doc.kind(c), NodeKind::BlankLine))
                .copied()
                .collect();
            for blank in trailing {
                ctx.doc.insert_after(list, blank);
            }
        }
        Ok(true)
    }
}
