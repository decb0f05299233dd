use std::collections::HashMap;

use crate::{
    config::Feed,
    error::{GridcastError, GridcastResult},
};

pub const GRID_COLUMNS: usize = 3;
pub const CELL_WIDTH: u32 = 640;
pub const CELL_HEIGHT: u32 = 360;

/// A feed's position within the composite grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutSlot {
    pub index: usize,
    pub x: u32,
    pub y: u32,
}

impl LayoutSlot {
    /// Grid cell for `index`, filling left-to-right then top-to-bottom.
    pub fn at(index: usize) -> Self {
        Self {
            index,
            x: (index % GRID_COLUMNS) as u32 * CELL_WIDTH,
            y: (index / GRID_COLUMNS) as u32 * CELL_HEIGHT,
        }
    }
}

/// A feed retained from the selection, paired with its grid slot.
#[derive(Clone, Debug)]
pub struct PlannedFeed {
    pub feed: Feed,
    pub slot: LayoutSlot,
}

/// Resolve a composite selection against the feed catalog.
///
/// Selection order decides slot order. Names not present in the catalog are
/// dropped silently; duplicates are kept and occupy one slot each. Slot
/// indices are contiguous from 0 over the retained feeds, not over the raw
/// selection.
pub fn plan(feeds: &[Feed], selection: &[String]) -> GridcastResult<Vec<PlannedFeed>> {
    let catalog: HashMap<&str, &Feed> = feeds.iter().map(|f| (f.name.as_str(), f)).collect();

    let planned: Vec<PlannedFeed> = selection
        .iter()
        .filter_map(|name| catalog.get(name.as_str()))
        .enumerate()
        .map(|(index, feed)| PlannedFeed {
            feed: (*feed).clone(),
            slot: LayoutSlot::at(index),
        })
        .collect();

    if planned.is_empty() {
        return Err(GridcastError::no_valid_feeds(
            "selection resolves to no known feeds",
        ));
    }
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Feed> {
        ["cam1", "cam2", "cam3"]
            .iter()
            .enumerate()
            .map(|(i, name)| Feed {
                name: name.to_string(),
                url: format!("rtsp://example/{i}"),
            })
            .collect()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn grid_positions_follow_formula() {
        for index in 0..9 {
            let slot = LayoutSlot::at(index);
            assert_eq!(slot.x, (index % 3) as u32 * 640);
            assert_eq!(slot.y, (index / 3) as u32 * 360);
        }
        assert_eq!(LayoutSlot::at(0), LayoutSlot { index: 0, x: 0, y: 0 });
        assert_eq!(LayoutSlot::at(4), LayoutSlot { index: 4, x: 640, y: 360 });
    }

    #[test]
    fn plan_drops_unknown_names_and_keeps_selection_order() {
        let planned = plan(&catalog(), &names(&["cam1", "cam3", "cam9"])).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].feed.name, "cam1");
        assert_eq!(planned[0].slot, LayoutSlot { index: 0, x: 0, y: 0 });
        assert_eq!(planned[1].feed.name, "cam3");
        assert_eq!(planned[1].slot, LayoutSlot { index: 1, x: 640, y: 0 });
    }

    #[test]
    fn plan_indices_are_contiguous_over_retained_feeds() {
        let planned = plan(&catalog(), &names(&["ghost", "cam2", "ghost", "cam1"])).unwrap();
        let indices: Vec<usize> = planned.iter().map(|p| p.slot.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(planned[0].feed.name, "cam2");
        assert_eq!(planned[1].feed.name, "cam1");
    }

    #[test]
    fn plan_tolerates_duplicate_selections() {
        let planned = plan(&catalog(), &names(&["cam1", "cam1"])).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].feed.name, "cam1");
        assert_eq!(planned[1].feed.name, "cam1");
        assert_eq!(planned[1].slot.index, 1);
    }

    #[test]
    fn plan_rejects_empty_and_unknown_only_selections() {
        assert!(matches!(
            plan(&catalog(), &[]),
            Err(GridcastError::NoValidFeeds(_))
        ));
        assert!(matches!(
            plan(&catalog(), &names(&["ghost", "phantom"])),
            Err(GridcastError::NoValidFeeds(_))
        ));
        assert!(matches!(
            plan(&[], &names(&["cam1"])),
            Err(GridcastError::NoValidFeeds(_))
        ));
    }
}
