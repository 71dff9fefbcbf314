//! Mirrors the configured group hierarchy, assembling each source on the way.

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;

use crate::config::{SourceConfig, SourceGroup};
use crate::ids::ThemeIdAllocator;
use crate::theme::{ThemeAssembler, ThemeRecord};

/// A group of themes in the client's theme switcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub items: Vec<ThemeRecord>,
    pub subdirs: Vec<GroupRecord>,
}

impl GroupRecord {
    /// Themes in this group and all nested groups, depth first.
    pub fn themes(&self) -> Vec<&ThemeRecord> {
        let mut themes: Vec<&ThemeRecord> = self.items.iter().collect();
        for subdir in &self.subdirs {
            themes.extend(subdir.themes());
        }
        themes
    }
}

/// Walks the source groups of one run.
///
/// Owns the run's theme id allocator and group counter, so a new builder
/// starts from a clean slate. Sources are assembled strictly one after the
/// other, items before subgroups, which keeps ids reproducible.
pub struct GroupTreeBuilder<'a> {
    assembler: ThemeAssembler<'a>,
    ids: ThemeIdAllocator,
    group_counter: u32,
    first_theme: Option<String>,
    default_theme: Option<String>,
}

impl<'a> GroupTreeBuilder<'a> {
    pub fn new(assembler: ThemeAssembler<'a>) -> Self {
        Self {
            assembler,
            ids: ThemeIdAllocator::new(),
            group_counter: 0,
            first_theme: None,
            default_theme: None,
        }
    }

    /// Build the record for `group`, tagged with `id`.
    ///
    /// Nested groups get ids `g1`, `g2`, ... in traversal order.
    pub fn build<'b>(&'b mut self, group: &'b SourceGroup, id: Option<String>) -> BoxFuture<'b, GroupRecord> {
        async move {
            let mut record = GroupRecord {
                id,
                title: group.title.clone(),
                items: Vec::with_capacity(group.items.len()),
                subdirs: Vec::with_capacity(group.groups.len()),
            };

            for source in &group.items {
                let theme = self.assembler.assemble(source, &mut self.ids).await;
                self.note_theme(source, &theme);
                record.items.push(theme);
            }

            for subgroup in &group.groups {
                self.group_counter += 1;
                let subgroup_id = format!("g{}", self.group_counter);
                let subdir = self.build(subgroup, Some(subgroup_id)).await;
                record.subdirs.push(subdir);
            }

            record
        }
        .boxed()
    }

    /// The first successfully assembled theme marked `default`, or the
    /// first successfully assembled theme.
    pub fn default_theme(&self) -> Option<&str> {
        self.default_theme
            .as_deref()
            .or(self.first_theme.as_deref())
    }

    fn note_theme(&mut self, source: &SourceConfig, theme: &ThemeRecord) {
        let Some(id) = theme.id.as_ref().filter(|_| !theme.is_error()) else {
            return;
        };
        if self.first_theme.is_none() {
            self.first_theme = Some(id.clone());
        }
        if source.default && self.default_theme.is_none() {
            self.default_theme = Some(id.clone());
        }
    }
}
