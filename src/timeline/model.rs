use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::foundation::core::Canvas;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::timeline::clip::Clip;

/// Ordered lane of clips. Index 0 in a track list is the front-most lane.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    /// Track id.
    pub id: String,
    /// Clips, conventionally non-overlapping and ordered by start.
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    /// Track holding a single clip.
    pub fn single(id: impl Into<String>, clip: Clip) -> Self {
        Self {
            id: id.into(),
            clips: vec![clip],
        }
    }

    fn sort_clips(&mut self) {
        self.clips.sort_by(|a, b| a.start.total_cmp(&b.start));
    }
}

/// Mutable track list enforcing the clip invariants on every edit.
///
/// Rendering and export never read this directly; they take a [`TimelineSnapshot`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    tracks: Vec<Track>,
}

impl Timeline {
    /// Empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from existing tracks, validating every clip and global id uniqueness.
    pub fn from_tracks(tracks: Vec<Track>) -> TesseraResult<Self> {
        let mut seen = HashSet::new();
        for clip in tracks.iter().flat_map(|t| &t.clips) {
            clip.validate()?;
            if !seen.insert(clip.id.as_str()) {
                return Err(TesseraError::validation(format!(
                    "duplicate clip id '{}'",
                    clip.id
                )));
            }
        }
        Ok(Self { tracks })
    }

    /// Tracks in front-to-back order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Append a track at the back (highest index).
    pub fn push_track(&mut self, track: Track) -> TesseraResult<usize> {
        self.insert_track(self.tracks.len(), track)
    }

    /// Insert a track at `index` (0 = front-most).
    pub fn insert_track(&mut self, index: usize, mut track: Track) -> TesseraResult<usize> {
        if index > self.tracks.len() {
            return Err(TesseraError::validation(format!(
                "track index {index} out of range"
            )));
        }
        for clip in &track.clips {
            clip.validate()?;
            self.ensure_unique(&clip.id)?;
        }
        let mut ids = HashSet::new();
        if let Some(dup) = track.clips.iter().find(|c| !ids.insert(c.id.as_str())) {
            return Err(TesseraError::validation(format!(
                "duplicate clip id '{}'",
                dup.id
            )));
        }
        track.sort_clips();
        self.tracks.insert(index, track);
        Ok(index)
    }

    /// Remove and return the track at `index`.
    pub fn remove_track(&mut self, index: usize) -> TesseraResult<Track> {
        if index >= self.tracks.len() {
            return Err(TesseraError::validation(format!(
                "track index {index} out of range"
            )));
        }
        Ok(self.tracks.remove(index))
    }

    /// Swap the stacking position of two tracks.
    pub fn swap_tracks(&mut self, a: usize, b: usize) -> TesseraResult<()> {
        let n = self.tracks.len();
        if a >= n || b >= n {
            return Err(TesseraError::validation(format!(
                "track swap ({a}, {b}) out of range for {n} tracks"
            )));
        }
        self.tracks.swap(a, b);
        Ok(())
    }

    /// Add `clip` to track `track`.
    pub fn add_clip(&mut self, track: usize, clip: Clip) -> TesseraResult<()> {
        clip.validate()?;
        self.ensure_unique(&clip.id)?;
        let t = self.track_mut(track)?;
        t.clips.push(clip);
        t.sort_clips();
        Ok(())
    }

    /// Remove a clip by id.
    pub fn remove_clip(&mut self, id: &str) -> TesseraResult<Clip> {
        let (ti, ci) = self.locate(id)?;
        Ok(self.tracks[ti].clips.remove(ci))
    }

    /// Apply `edit` to a copy of the clip and commit it only if the result still holds the
    /// invariants (including id uniqueness when the id changes).
    pub fn update_clip(&mut self, id: &str, edit: impl FnOnce(&mut Clip)) -> TesseraResult<()> {
        let (ti, ci) = self.locate(id)?;
        let mut next = self.tracks[ti].clips[ci].clone();
        edit(&mut next);
        next.validate()?;
        if next.id != id {
            self.ensure_unique(&next.id)?;
        }
        self.tracks[ti].clips[ci] = next;
        self.tracks[ti].sort_clips();
        Ok(())
    }

    /// Move a clip to another track and start time.
    pub fn move_clip(&mut self, id: &str, to_track: usize, start: f64) -> TesseraResult<()> {
        if to_track >= self.tracks.len() {
            return Err(TesseraError::validation(format!(
                "track index {to_track} out of range"
            )));
        }
        let (ti, ci) = self.locate(id)?;
        let mut clip = self.tracks[ti].clips[ci].clone();
        clip.start = start;
        clip.validate()?;
        self.tracks[ti].clips.remove(ci);
        let t = &mut self.tracks[to_track];
        t.clips.push(clip);
        t.sort_clips();
        Ok(())
    }

    /// Find a clip and its track index.
    pub fn find_clip(&self, id: &str) -> Option<(usize, &Clip)> {
        self.tracks.iter().enumerate().find_map(|(ti, t)| {
            t.clips.iter().find(|c| c.id == id).map(|c| (ti, c))
        })
    }

    /// Capture an immutable view of the current tracks.
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot::new(self.tracks.clone())
    }

    fn track_mut(&mut self, index: usize) -> TesseraResult<&mut Track> {
        self.tracks
            .get_mut(index)
            .ok_or_else(|| TesseraError::validation(format!("track index {index} out of range")))
    }

    fn locate(&self, id: &str) -> TesseraResult<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(ti, t)| t.clips.iter().position(|c| c.id == id).map(|ci| (ti, ci)))
            .ok_or_else(|| TesseraError::validation(format!("unknown clip id '{id}'")))
    }

    fn ensure_unique(&self, id: &str) -> TesseraResult<()> {
        if self.find_clip(id).is_some() {
            return Err(TesseraError::validation(format!("duplicate clip id '{id}'")));
        }
        Ok(())
    }
}

/// Immutable, cheaply clonable view of a track list.
///
/// Captured once per render or export so the operation never observes concurrent edits.
#[derive(Clone, Debug, Default)]
pub struct TimelineSnapshot {
    tracks: Arc<Vec<Track>>,
}

impl TimelineSnapshot {
    /// Wrap a track list.
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: Arc::new(tracks),
        }
    }

    /// Tracks in front-to-back order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Clips active at `t` paired with their track index, in draw order: descending track index,
    /// so track 0 is drawn last and ends up on top. Within a track, clips keep start order.
    pub fn active_clips(&self, t: f64) -> Vec<(usize, &Clip)> {
        let mut out: Vec<(usize, &Clip)> = self
            .tracks
            .iter()
            .enumerate()
            .flat_map(|(ti, track)| track.clips.iter().map(move |c| (ti, c)))
            .filter(|(_, c)| c.is_active_at(t))
            .collect();
        out.sort_by(|a, b| b.0.cmp(&a.0));
        out
    }

    /// Every clip across all tracks.
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|t| t.clips.iter())
    }

    /// Latest clip end, or 0 for an empty timeline.
    pub fn duration(&self) -> f64 {
        self.clips().map(Clip::end).fold(0.0, f64::max)
    }
}

/// Persisted project: canvas, tracks and the reverse asset manifests.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Output canvas.
    pub canvas: Canvas,
    /// Canvas aspect ratio as reported by the template preset.
    pub aspect_ratio: f64,
    /// Project duration in seconds.
    pub duration: f64,
    /// Tracks, front-most first.
    pub tracks: Vec<Track>,
    /// Font family to the ids of clips using it.
    #[serde(default)]
    pub font_manifest: BTreeMap<String, Vec<String>>,
    /// Image URL to the ids of clips using it.
    #[serde(default)]
    pub image_manifest: BTreeMap<String, Vec<String>>,
}

impl Project {
    /// Parse a project from JSON and validate its tracks.
    pub fn from_json(json: &str) -> TesseraResult<Self> {
        let project: Self = serde_json::from_str(json)
            .map_err(|e| TesseraError::validation(format!("invalid project json: {e}")))?;
        Canvas::new(project.canvas.width, project.canvas.height)?;
        Timeline::from_tracks(project.tracks.clone())?;
        Ok(project)
    }

    /// Pretty JSON.
    pub fn to_json_pretty(&self) -> TesseraResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TesseraError::Other(anyhow::anyhow!("project serialization: {e}")))
    }

    /// Immutable snapshot of the tracks.
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot::new(self.tracks.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
