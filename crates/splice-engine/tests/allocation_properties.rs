use splice_core::{CableId, Circuit, CircuitId, StrandSpan};
use splice_engine::{allocate, find_feed_match, format, parse, ribbon_chunks, segment};
use proptest::prelude::*;

// Any comma-free text, with no whitespace at either end.
fn prefix() -> impl Strategy<Value = String> {
    "[^,\\s]([^,]{0,8}[^,\\s])?"
}

fn bound() -> impl Strategy<Value = u32> {
    prop_oneof![0u32..200, (u32::MAX - 100)..=u32::MAX]
}

fn identifier() -> impl Strategy<Value = (String, u32, u32)> {
    (prefix(), bound(), 0u32..48)
        .prop_map(|(prefix, start, extra)| (prefix, start, start.saturating_add(extra)))
}

fn padding() -> impl Strategy<Value = String> {
    "[ \\t]{0,3}"
}

fn feed_circuit(identifier: &str, start: u32, end: u32) -> Circuit {
    Circuit {
        id: CircuitId::from_raw("feed-circuit"),
        cable_id: CableId::from_raw("feed"),
        identifier: identifier.to_string(),
        order_index: 0,
        strand_start: start,
        strand_end: end,
        splice: None,
    }
}

proptest! {
    #[test]
    fn allocation_is_contiguous_from_one(ids in prop::collection::vec(identifier(), 0..24)) {
        let texts: Vec<String> = ids.iter().map(|(p, s, e)| format(p, *s, *e)).collect();
        let allocation = allocate(&texts);
        prop_assert!(allocation.rejected.is_empty());
        let mut cursor = 1;
        for (entry, (_, start, end)) in allocation.spans.iter().zip(&ids) {
            prop_assert_eq!(entry.span.start, cursor);
            prop_assert_eq!(entry.span.width(), end - start + 1);
            cursor = entry.span.end + 1;
        }
        prop_assert_eq!(allocation.assigned(), cursor - 1);
        prop_assert_eq!(allocate(&texts), allocation);
    }

    #[test]
    fn formatted_identifiers_parse_back((p, start, end) in identifier()) {
        let parsed = parse(&format(&p, start, end)).unwrap();
        prop_assert_eq!(parsed.prefix, p);
        prop_assert_eq!((parsed.range_start, parsed.range_end), (start, end));
    }

    #[test]
    fn any_ordered_bounds_parse_or_report(p in prefix(), a in any::<u32>(), b in any::<u32>()) {
        let (start, end) = (a.min(b), a.max(b));
        match parse(&format(&p, start, end)) {
            Ok(parsed) => {
                prop_assert_eq!(parsed.width() as u64, end as u64 - start as u64 + 1);
                prop_assert_eq!(parsed.prefix, p);
            }
            Err(err) => {
                prop_assert_eq!((start, end), (0, u32::MAX));
                prop_assert_eq!(err.info().code.as_str(), "range-too-wide");
            }
        }
    }

    #[test]
    fn whitespace_around_every_token_is_trimmed(
        (p, start, end) in identifier(),
        pads in prop::collection::vec(padding(), 6),
    ) {
        let text = std::format!(
            "{}{p}{},{}{start}{}-{}{end}{}",
            pads[0], pads[1], pads[2], pads[3], pads[4], pads[5]
        );
        let parsed = parse(&text).unwrap();
        prop_assert_eq!(parsed.prefix, p);
        prop_assert_eq!((parsed.range_start, parsed.range_end), (start, end));
    }

    #[test]
    fn containment_drives_matching(
        (p, start, end) in identifier(),
        dist_start in 1u32..260,
        dist_extra in 0u32..20,
        feed_base in 1u32..400,
    ) {
        let feed_text = format(&p, start, end);
        let dist = parse(&format(&p, dist_start, dist_start + dist_extra)).unwrap();
        let feed_end = feed_base + (end - start);
        let feeds = vec![feed_circuit(&feed_text, feed_base, feed_end)];
        let contained = parse(&feed_text).unwrap().contains(&dist);
        let found = find_feed_match(&dist, &feeds);
        prop_assert_eq!(found.is_some(), contained);
        if let Some(found) = found {
            let offset = dist.range_start - start;
            prop_assert_eq!(found.feed_span.start, feed_base + offset);
            prop_assert_eq!(found.feed_span.width(), dist.width());
            prop_assert!(found.feed_span.end <= feed_end);
        }
    }

    #[test]
    fn other_prefixes_never_match(start in 1u32..50, width in 1u32..10) {
        let feeds = vec![feed_circuit("pon,1-100", 1, 100)];
        let dist = parse(&format("gpon", start, start + width - 1)).unwrap();
        prop_assert!(find_feed_match(&dist, &feeds).is_none());
    }

    #[test]
    fn segments_cover_both_ranges_in_lock_step(
        dist_start in 1u32..100,
        feed_start in 1u32..100,
        width in 1u32..60,
        group in prop::sample::select(vec![12u32, 25]),
    ) {
        let dist = StrandSpan::new(dist_start, dist_start + width - 1);
        let feed = StrandSpan::new(feed_start, feed_start + width - 1);
        let rows = segment(dist, Some(feed), group);
        prop_assert!(rows.is_valid());

        let mut dist_cursor = dist.start;
        let mut feed_cursor = feed.start;
        for row in &rows.segments {
            let dist_span = row.dist_span(group);
            let feed_span = row.feed_span(group);
            prop_assert_eq!(dist_span.start, dist_cursor);
            prop_assert_eq!(feed_span.start, feed_cursor);
            prop_assert_eq!(dist_span.width(), feed_span.width());
            prop_assert!(row.dist_pos_end <= group && row.feed_pos_end <= group);
            dist_cursor = dist_span.end + 1;
            feed_cursor = feed_span.end + 1;
        }
        prop_assert_eq!(dist_cursor, dist.end + 1);
        prop_assert_eq!(feed_cursor, feed.end + 1);
    }

    #[test]
    fn ribbon_chunks_partition_the_span(start in 1u32..300, width in 1u32..80) {
        let span = StrandSpan::new(start, start + width - 1);
        let chunks = ribbon_chunks(span, 12);
        let total: u32 = chunks.iter().map(|chunk| chunk.span.width()).sum();
        prop_assert_eq!(total, width);
        prop_assert_eq!(chunks.first().map(|c| c.span.start), Some(span.start));
        prop_assert_eq!(chunks.last().map(|c| c.span.end), Some(span.end));
    }
}
