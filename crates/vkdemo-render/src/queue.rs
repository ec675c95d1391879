// SPDX-License-Identifier: CEPL-1.0
use std::collections::BTreeSet;
use std::panic::Location;
use thiserror::Error;

bitflags::bitflags! {
    /// Roles a queue family can fill.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct QueueCaps: u8 {
        const GRAPHICS = 1 << 0;
        const COMPUTE  = 1 << 1;
        const PRESENT  = 1 << 2;
    }
}

/// A required role has no family. Carries the location of the lookup that
/// needed it, the same way `check!` failures do.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("queue family for {role:?} failed at {file}:{line}")]
pub struct MissingQueueFamily {
    pub role: QueueCaps,
    pub file: &'static str,
    pub line: u32,
}

impl MissingQueueFamily {
    #[track_caller]
    fn here(role: QueueCaps) -> Self {
        let at = Location::caller();
        Self {
            role,
            file: at.file(),
            line: at.line(),
        }
    }
}

/// Family index chosen for each role; `None` until a family offering it is seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub compute: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Roles that already have a family.
    pub fn found(&self) -> QueueCaps {
        let mut caps = QueueCaps::empty();
        caps.set(QueueCaps::GRAPHICS, self.graphics.is_some());
        caps.set(QueueCaps::COMPUTE, self.compute.is_some());
        caps.set(QueueCaps::PRESENT, self.present.is_some());
        caps
    }

    pub fn covers(&self, required: QueueCaps) -> bool {
        self.found().contains(required)
    }

    #[track_caller]
    pub fn require(&self, required: QueueCaps) -> Result<(), MissingQueueFamily> {
        let missing = required.difference(self.found());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingQueueFamily::here(missing))
        }
    }

    /// Family chosen for a single role.
    #[track_caller]
    pub fn role(&self, role: QueueCaps) -> Result<u32, MissingQueueFamily> {
        let found = if role == QueueCaps::GRAPHICS {
            self.graphics
        } else if role == QueueCaps::COMPUTE {
            self.compute
        } else if role == QueueCaps::PRESENT {
            self.present
        } else {
            None
        };
        found.ok_or_else(|| MissingQueueFamily::here(role))
    }

    /// Distinct family indices of the `required` roles, ascending. Roles may
    /// share a family, so this can be shorter than the role count. Families
    /// picked up for roles outside `required` are left out.
    pub fn families_for(&self, required: QueueCaps) -> BTreeSet<u32> {
        [
            (QueueCaps::GRAPHICS, self.graphics),
            (QueueCaps::COMPUTE, self.compute),
            (QueueCaps::PRESENT, self.present),
        ]
        .into_iter()
        .filter(|(role, _)| required.contains(*role))
        .filter_map(|(_, family)| family)
        .collect()
    }
}

/// Walk queue families in enumeration order and give each role the first family
/// that offers it. One family may fill several roles.
///
/// `families` yields the capabilities of family 0, 1, 2, ...; it is consumed lazily
/// and iteration stops as soon as every `required` role has a family, so expensive
/// per-family queries (presentation support) are not made for later families.
pub fn select_queue_families<I>(families: I, required: QueueCaps) -> QueueFamilyIndices
where
    I: IntoIterator<Item = QueueCaps>,
{
    let mut indices = QueueFamilyIndices::default();
    for (i, caps) in families.into_iter().enumerate() {
        let i = i as u32;
        if caps.contains(QueueCaps::GRAPHICS) && indices.graphics.is_none() {
            indices.graphics = Some(i);
        }
        if caps.contains(QueueCaps::COMPUTE) && indices.compute.is_none() {
            indices.compute = Some(i);
        }
        if caps.contains(QueueCaps::PRESENT) && indices.present.is_none() {
            indices.present = Some(i);
        }
        if indices.covers(required) {
            break;
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const ALL: QueueCaps = QueueCaps::all();

    #[test]
    fn single_family_fills_every_role() {
        let idx = select_queue_families([ALL], ALL);
        assert_eq!(idx.graphics, Some(0));
        assert_eq!(idx.compute, Some(0));
        assert_eq!(idx.present, Some(0));
        assert_eq!(idx.families_for(ALL).into_iter().collect::<Vec<_>>(), [0]);
    }

    #[test]
    fn lower_index_wins_ties() {
        let families = [
            QueueCaps::COMPUTE,
            QueueCaps::GRAPHICS | QueueCaps::COMPUTE,
            QueueCaps::GRAPHICS | QueueCaps::PRESENT,
        ];
        let idx = select_queue_families(families, ALL);
        assert_eq!(idx.compute, Some(0));
        assert_eq!(idx.graphics, Some(1));
        assert_eq!(idx.present, Some(2));
        assert_eq!(idx.families_for(ALL).into_iter().collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn stops_once_required_roles_are_found() {
        let visited = Cell::new(0usize);
        let families = [
            QueueCaps::GRAPHICS | QueueCaps::COMPUTE,
            QueueCaps::PRESENT,
            ALL,
            ALL,
        ];
        let idx = select_queue_families(
            families.iter().map(|&c| {
                visited.set(visited.get() + 1);
                c
            }),
            ALL,
        );
        assert_eq!(visited.get(), 2);
        assert_eq!(idx.present, Some(1));
    }

    #[test]
    fn graphics_only_requirement_stops_at_first_graphics_family() {
        let visited = Cell::new(0usize);
        let families = [QueueCaps::COMPUTE, QueueCaps::GRAPHICS, QueueCaps::PRESENT];
        let idx = select_queue_families(
            families.iter().map(|&c| {
                visited.set(visited.get() + 1);
                c
            }),
            QueueCaps::GRAPHICS,
        );
        assert_eq!(visited.get(), 2);
        assert_eq!(idx.graphics, Some(1));
        assert_eq!(idx.present, None);
        assert!(idx.require(QueueCaps::GRAPHICS).is_ok());
        assert_eq!(idx.role(QueueCaps::GRAPHICS), Ok(1));
        assert_eq!(
            idx.role(QueueCaps::PRESENT).map_err(|e| e.role),
            Err(QueueCaps::PRESENT)
        );
    }

    #[test]
    fn empty_families_fill_nothing() {
        let idx = select_queue_families([QueueCaps::empty(), QueueCaps::COMPUTE], ALL);
        assert_eq!(idx.graphics, None);
        assert_eq!(idx.compute, Some(1));
        assert_eq!(
            idx.require(ALL).map_err(|e| e.role),
            Err(QueueCaps::GRAPHICS | QueueCaps::PRESENT)
        );
    }

    #[test]
    fn queue_set_holds_only_required_roles() {
        // Compute is seen first on the way to graphics.
        let idx = select_queue_families(
            [QueueCaps::COMPUTE, QueueCaps::GRAPHICS],
            QueueCaps::GRAPHICS,
        );
        assert_eq!(idx.compute, Some(0));
        assert_eq!(
            idx.families_for(QueueCaps::GRAPHICS).into_iter().collect::<Vec<_>>(),
            [1]
        );
        assert_eq!(idx.families_for(ALL).len(), 2);
    }

    #[test]
    fn missing_role_reports_lookup_site() {
        let idx = QueueFamilyIndices::default();
        let line = line!() + 1;
        let err = idx.role(QueueCaps::GRAPHICS).unwrap_err();
        assert_eq!(err.file, file!());
        assert_eq!(err.line, line);
        assert_eq!(
            err.to_string(),
            format!("queue family for QueueCaps(GRAPHICS) failed at {}:{line}", file!())
        );
    }

    #[test]
    fn exhaustive_masks_pick_first_match_per_role() {
        // Every assignment of capability masks to three families.
        for a in 0..8u8 {
            for b in 0..8u8 {
                for c in 0..8u8 {
                    let families = [a, b, c].map(QueueCaps::from_bits_truncate);
                    let idx = select_queue_families(families, ALL);
                    for (role, got) in [
                        (QueueCaps::GRAPHICS, idx.graphics),
                        (QueueCaps::COMPUTE, idx.compute),
                        (QueueCaps::PRESENT, idx.present),
                    ] {
                        let expected = families
                            .iter()
                            .position(|f| f.contains(role))
                            .map(|p| p as u32);
                        assert_eq!(got, expected, "masks {a} {b} {c} role {role:?}");
                    }
                }
            }
        }
    }
}
