//! Path selection workflow
//!
//! Before a scan starts the user picks the directories to search through a
//! short, ordered list of selector slots. Slots are appended and removed
//! only at the end, so indices always stay a dense `0..len` range.

use adbf_protocol::{ClientCommand, DirRequest};
use adbf_utils::{AdbfError, Result};

use crate::delta::StateDelta;

/// Label shown for slot 0 while it has no directory
pub const HOME_HINT: &str = "home";

/// Name given to an entry detected as the parent directory
pub const PARENT_NAME: &str = "..";

/// One directory selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSlot {
    pub index: usize,
    pub chosen_directory: Option<String>,
    pub pending_listing: bool,
    /// Latest listing for this slot, replaced on every `rest_dirs`
    pub listing: Vec<ListingEntry>,
}

impl PathSlot {
    fn new(index: usize, chosen_directory: Option<String>) -> Self {
        Self {
            index,
            chosen_directory,
            pending_listing: false,
            listing: Vec::new(),
        }
    }

    /// Directory to show in the selector
    pub fn display_directory(&self) -> &str {
        match &self.chosen_directory {
            Some(dir) => dir,
            None if self.index == 0 => HOME_HINT,
            None => "",
        }
    }

    /// Directory sent to the server, empty when unset
    pub fn requested_directory(&self) -> String {
        self.chosen_directory.clone().unwrap_or_default()
    }
}

/// A directory returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: String,
    pub name: String,
    pub is_parent: bool,
}

/// Ordered, bounded list of path slots
#[derive(Debug, Clone)]
pub struct PathWorkflow {
    slots: Vec<PathSlot>,
    max_slots: usize,
    confirmed: Option<Vec<String>>,
}

impl PathWorkflow {
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_slots,
            confirmed: None,
        }
    }

    pub fn slots(&self) -> &[PathSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&PathSlot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.is_some()
    }

    /// Directories sent with the `start` command, once confirmed
    pub fn confirmed_directories(&self) -> Option<&[String]> {
        self.confirmed.as_deref()
    }

    /// Append a slot at the next index
    pub fn add_slot(&mut self, remembered: Option<String>) -> Result<StateDelta> {
        self.ensure_unlocked()?;
        if self.slots.len() >= self.max_slots {
            return Err(AdbfError::CapacityExceeded {
                max: self.max_slots,
            });
        }

        let slot = PathSlot::new(self.slots.len(), remembered);
        self.slots.push(slot.clone());
        Ok(StateDelta::SlotAdded { slot })
    }

    /// Remove the highest index slot together with any pending listing
    pub fn remove_last_slot(&mut self) -> Result<StateDelta> {
        self.ensure_unlocked()?;
        let slot = self.slots.pop().ok_or(AdbfError::EmptyWorkflow)?;
        Ok(StateDelta::SlotRemoved { index: slot.index })
    }

    /// Mark a listing as pending and build the `rest_dir` command for it
    pub fn request_listing(&mut self, index: usize) -> Result<(ClientCommand, StateDelta)> {
        self.ensure_unlocked()?;
        let slot = self.slot_mut(index)?;
        slot.pending_listing = true;

        let command = ClientCommand::RestDir(DirRequest {
            nr: index,
            dir: slot.requested_directory(),
        });
        Ok((command, StateDelta::ListingRequested { index }))
    }

    /// Store a listing received from the server
    ///
    /// Whether the first entry is the parent directory is decided by
    /// substring containment, see [`label_listing`].
    pub fn apply_listing(&mut self, index: usize, dirs: &[String]) -> Result<StateDelta> {
        let slot = self.slot_mut(index)?;
        if !slot.pending_listing {
            tracing::debug!(slot = index, "listing arrived without a pending request");
        }

        let entries = label_listing(dirs, slot.chosen_directory.as_deref());
        slot.pending_listing = false;
        slot.listing = entries.clone();
        Ok(StateDelta::ListingApplied { index, entries })
    }

    /// Select a directory for a slot, discarding its previous listing
    pub fn choose_directory(&mut self, index: usize, dir: impl Into<String>) -> Result<StateDelta> {
        self.ensure_unlocked()?;
        let dir = dir.into();
        let slot = self.slot_mut(index)?;
        slot.chosen_directory = Some(dir.clone());
        slot.listing.clear();
        Ok(StateDelta::DirectoryChosen { index, dir })
    }

    /// Freeze the selection and build the `start` command
    ///
    /// Slots stay in place as the record of what was requested.
    pub fn confirm_selections(&mut self) -> Result<(ClientCommand, StateDelta)> {
        self.ensure_unlocked()?;
        if self.slots.is_empty() {
            return Err(AdbfError::EmptyWorkflow);
        }

        let dirs: Vec<String> = self
            .slots
            .iter()
            .map(PathSlot::requested_directory)
            .collect();
        self.confirmed = Some(dirs.clone());
        Ok((
            ClientCommand::Start(dirs.clone()),
            StateDelta::SelectionsConfirmed { dirs },
        ))
    }

    /// Create one slot per remembered directory sent by the server
    ///
    /// Only a fresh workflow is seeded; a repeated `init_paths` (after a
    /// reconnect) would otherwise duplicate the user's slots.
    pub fn seed(&mut self, remembered: &[String]) -> Vec<StateDelta> {
        if self.is_confirmed() || !self.slots.is_empty() {
            tracing::debug!(
                slots = self.slots.len(),
                "ignoring remembered paths, workflow already populated"
            );
            return Vec::new();
        }

        let mut deltas = Vec::with_capacity(remembered.len());
        for dir in remembered {
            match self.add_slot(Some(dir.clone())) {
                Ok(delta) => deltas.push(delta),
                Err(e) => {
                    tracing::warn!("dropping remembered path '{}': {}", dir, e);
                    break;
                }
            }
        }
        deltas
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut PathSlot> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(AdbfError::InvalidSlot { index, len })
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.is_confirmed() {
            return Err(AdbfError::WorkflowLocked);
        }
        Ok(())
    }
}

/// Turn raw listing paths into display entries
///
/// The first entry counts as the parent directory when
/// - there are at least two entries and the second contains the first, or
/// - it is the only entry and the chosen directory contains it.
///
/// This is plain substring containment, not a path prefix test.
pub fn label_listing(dirs: &[String], chosen: Option<&str>) -> Vec<ListingEntry> {
    let first_is_parent = match dirs {
        [] => false,
        [only] => chosen.is_some_and(|chosen| chosen.contains(only.as_str())),
        [first, second, ..] => second.contains(first.as_str()),
    };

    dirs.iter()
        .enumerate()
        .map(|(i, path)| {
            let is_parent = i == 0 && first_is_parent;
            let name = if is_parent {
                PARENT_NAME.to_string()
            } else {
                last_segment(path).to_string()
            };
            ListingEntry {
                path: path.clone(),
                name,
                is_parent,
            }
        })
        .collect()
}

/// Final `/` separated segment, ignoring trailing separators
pub fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_dense(workflow: &PathWorkflow) {
        for (i, slot) in workflow.slots().iter().enumerate() {
            assert_eq!(slot.index, i);
        }
    }

    // ==================== Slot lifecycle ====================

    #[test]
    fn test_add_slot_appends_dense_index() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        let delta = workflow.add_slot(Some("/music".into())).unwrap();

        match delta {
            StateDelta::SlotAdded { slot } => {
                assert_eq!(slot.index, 1);
                assert_eq!(slot.chosen_directory.as_deref(), Some("/music"));
            }
            other => panic!("unexpected delta {:?}", other),
        }
        assert_dense(&workflow);
    }

    #[test]
    fn test_add_slot_beyond_capacity() {
        let mut workflow = PathWorkflow::new(2);
        workflow.add_slot(None).unwrap();
        workflow.add_slot(None).unwrap();

        let result = workflow.add_slot(None);
        assert!(matches!(result, Err(AdbfError::CapacityExceeded { max: 2 })));
        assert_eq!(workflow.len(), 2);
    }

    #[test]
    fn test_remove_last_slot() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.add_slot(None).unwrap();

        let delta = workflow.remove_last_slot().unwrap();
        assert_eq!(delta, StateDelta::SlotRemoved { index: 1 });
        assert_eq!(workflow.len(), 1);
    }

    #[test]
    fn test_remove_on_empty_workflow() {
        let mut workflow = PathWorkflow::new(3);
        assert!(matches!(
            workflow.remove_last_slot(),
            Err(AdbfError::EmptyWorkflow)
        ));
        assert!(workflow.is_empty());
    }

    #[test]
    fn test_indices_stay_dense_over_mixed_sequence() {
        let mut workflow = PathWorkflow::new(4);
        let ops = [true, true, false, true, true, true, false, false, true, false];
        for add in ops {
            if add {
                let _ = workflow.add_slot(None);
            } else {
                let _ = workflow.remove_last_slot();
            }
            assert_dense(&workflow);
            assert!(workflow.len() <= 4);
        }
    }

    #[test]
    fn test_removing_slot_drops_pending_listing() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.request_listing(0).unwrap();
        workflow.remove_last_slot().unwrap();
        workflow.add_slot(None).unwrap();

        assert!(!workflow.slot(0).unwrap().pending_listing);
    }

    // ==================== Display hint ====================

    #[test]
    fn test_slot_zero_home_hint() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.add_slot(None).unwrap();

        assert_eq!(workflow.slot(0).unwrap().display_directory(), HOME_HINT);
        assert_eq!(workflow.slot(1).unwrap().display_directory(), "");

        workflow.choose_directory(0, "/srv").unwrap();
        assert_eq!(workflow.slot(0).unwrap().display_directory(), "/srv");
    }

    // ==================== Listings ====================

    #[test]
    fn test_request_listing_uses_chosen_directory() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(Some("/home/user".into())).unwrap();

        let (command, delta) = workflow.request_listing(0).unwrap();
        assert_eq!(
            command,
            ClientCommand::RestDir(DirRequest {
                nr: 0,
                dir: "/home/user".into()
            })
        );
        assert_eq!(delta, StateDelta::ListingRequested { index: 0 });
        assert!(workflow.slot(0).unwrap().pending_listing);
    }

    #[test]
    fn test_request_listing_unset_sends_empty_dir() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();

        let (command, _) = workflow.request_listing(0).unwrap();
        assert_eq!(
            command,
            ClientCommand::RestDir(DirRequest {
                nr: 0,
                dir: String::new()
            })
        );
    }

    #[test]
    fn test_request_listing_invalid_slot() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();

        let result = workflow.request_listing(1);
        assert!(matches!(
            result,
            Err(AdbfError::InvalidSlot { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_apply_listing_clears_pending() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.request_listing(0).unwrap();

        workflow
            .apply_listing(0, &strings(&["/home", "/home/user"]))
            .unwrap();
        let slot = workflow.slot(0).unwrap();
        assert!(!slot.pending_listing);
        assert_eq!(slot.listing.len(), 2);
    }

    #[test]
    fn test_apply_listing_invalid_slot() {
        let mut workflow = PathWorkflow::new(3);
        assert!(matches!(
            workflow.apply_listing(0, &[]),
            Err(AdbfError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn test_new_listing_replaces_previous() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.apply_listing(0, &strings(&["/x", "/y", "/z"])).unwrap();
        workflow.apply_listing(0, &strings(&["/q"])).unwrap();

        let listing = &workflow.slot(0).unwrap().listing;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].path, "/q");
    }

    #[test]
    fn test_choose_directory_discards_listing() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.apply_listing(0, &strings(&["/a", "/a/b"])).unwrap();

        let delta = workflow.choose_directory(0, "/a/b").unwrap();
        assert_eq!(
            delta,
            StateDelta::DirectoryChosen {
                index: 0,
                dir: "/a/b".into()
            }
        );
        let slot = workflow.slot(0).unwrap();
        assert!(slot.listing.is_empty());
        assert_eq!(slot.chosen_directory.as_deref(), Some("/a/b"));
    }

    // ==================== Parent detection ====================

    #[test]
    fn test_parent_when_second_contains_first() {
        let entries = label_listing(&strings(&["/a/b", "/a/b/c"]), None);
        assert!(entries[0].is_parent);
        assert_eq!(entries[0].name, PARENT_NAME);
        assert!(!entries[1].is_parent);
        assert_eq!(entries[1].name, "c");
    }

    #[test]
    fn test_single_entry_parent_of_chosen() {
        let entries = label_listing(&strings(&["/a/b"]), Some("/a/b/c"));
        assert!(entries[0].is_parent);
    }

    #[test]
    fn test_single_entry_without_chosen() {
        let entries = label_listing(&strings(&["/a/b"]), None);
        assert!(!entries[0].is_parent);
        assert_eq!(entries[0].name, "b");
    }

    #[test]
    fn test_unrelated_entries_use_last_segment() {
        let entries = label_listing(&strings(&["/x", "/y"]), None);
        assert!(!entries[0].is_parent);
        assert_eq!(entries[0].name, "x");
        assert_eq!(entries[1].name, "y");
    }

    #[test]
    fn test_substring_not_prefix() {
        // "/a/b" is inside "/z/a/b/c" without being a path prefix
        let entries = label_listing(&strings(&["/a/b", "/z/a/b/c"]), None);
        assert!(entries[0].is_parent);
    }

    #[test]
    fn test_empty_listing() {
        assert!(label_listing(&[], Some("/a")).is_empty());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/home/user/music"), "music");
        assert_eq!(last_segment("/home/user/music/"), "music");
        assert_eq!(last_segment("/home/user/.."), "..");
        assert_eq!(last_segment("/"), "/");
        assert_eq!(last_segment("relative"), "relative");
    }

    // ==================== Confirmation ====================

    #[test]
    fn test_confirm_selections() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(Some("/music".into())).unwrap();
        workflow.add_slot(None).unwrap();

        let (command, delta) = workflow.confirm_selections().unwrap();
        let expected = strings(&["/music", ""]);
        assert_eq!(command, ClientCommand::Start(expected.clone()));
        assert_eq!(delta, StateDelta::SelectionsConfirmed { dirs: expected });

        // Slots persist as the record of the request
        assert_eq!(workflow.len(), 2);
        assert!(workflow.is_confirmed());
        assert_eq!(
            workflow.confirmed_directories(),
            Some(&strings(&["/music", ""])[..])
        );
    }

    #[test]
    fn test_confirm_empty_workflow() {
        let mut workflow = PathWorkflow::new(3);
        assert!(matches!(
            workflow.confirm_selections(),
            Err(AdbfError::EmptyWorkflow)
        ));
        assert!(!workflow.is_confirmed());
    }

    #[test]
    fn test_confirmed_workflow_is_locked() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(None).unwrap();
        workflow.confirm_selections().unwrap();

        assert!(matches!(workflow.add_slot(None), Err(AdbfError::WorkflowLocked)));
        assert!(matches!(
            workflow.remove_last_slot(),
            Err(AdbfError::WorkflowLocked)
        ));
        assert!(matches!(
            workflow.choose_directory(0, "/x"),
            Err(AdbfError::WorkflowLocked)
        ));
        assert!(matches!(
            workflow.request_listing(0),
            Err(AdbfError::WorkflowLocked)
        ));
        assert!(matches!(
            workflow.confirm_selections(),
            Err(AdbfError::WorkflowLocked)
        ));
    }

    // ==================== Seeding ====================

    #[test]
    fn test_seed_creates_slot_per_path() {
        let mut workflow = PathWorkflow::new(3);
        let deltas = workflow.seed(&strings(&["/a", "/b"]));

        assert_eq!(deltas.len(), 2);
        assert_eq!(workflow.slot(1).unwrap().chosen_directory.as_deref(), Some("/b"));
    }

    #[test]
    fn test_seed_truncates_at_capacity() {
        let mut workflow = PathWorkflow::new(2);
        let deltas = workflow.seed(&strings(&["/a", "/b", "/c"]));

        assert_eq!(deltas.len(), 2);
        assert_eq!(workflow.len(), 2);
    }

    #[test]
    fn test_seed_ignored_when_populated() {
        let mut workflow = PathWorkflow::new(3);
        workflow.add_slot(Some("/mine".into())).unwrap();

        assert!(workflow.seed(&strings(&["/a"])).is_empty());
        assert_eq!(workflow.len(), 1);
        assert_eq!(
            workflow.slot(0).unwrap().chosen_directory.as_deref(),
            Some("/mine")
        );
    }
}
