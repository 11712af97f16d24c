use crate::{
    error::{Error, Result},
    segment::{Comment, Frame, Scan},
    tables::TableRegistry,
};

/// Identifies a [`Frame`] within a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Returns the index of the frame in [`Document::frames`].
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The structure of a JPEG stream: its comments, tables, and frames.
///
/// Every call to [`open`][crate::open] produces a new, independent document.
#[derive(Debug, Default, Clone)]
pub struct Document {
    comments: Vec<Comment>,
    tables: TableRegistry,
    frames: Vec<Frame>,
    restart_interval: Option<u16>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn add_frame(&mut self, frame: Frame) -> FrameId {
        self.frames.push(frame);
        FrameId(self.frames.len() - 1)
    }

    /// Appends `scan` to the frame identified by `id`.
    ///
    /// Any frame of the document may receive scans, not just the last one.
    pub fn append_scan(&mut self, id: FrameId, scan: Scan) -> Result<()> {
        let frame_count = self.frames.len();
        let Some(frame) = self.frames.get_mut(id.0) else {
            return Err(Error::structural(
                format!(
                    "frame {} does not exist (document has {} frames)",
                    id.0, frame_count
                ),
                None,
                None,
            ));
        };
        frame.push_scan(scan);
        Ok(())
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Returns the most recently added frame.
    #[inline]
    pub fn last_frame(&self) -> Option<FrameId> {
        self.frames.len().checked_sub(1).map(FrameId)
    }

    #[inline]
    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    /// Returns all frames, in the order they appear in the stream.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns all comments, in the order they appear in the stream.
    #[inline]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    #[inline]
    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    #[inline]
    pub fn tables_mut(&mut self) -> &mut TableRegistry {
        &mut self.tables
    }

    /// Returns the number of MCUs per restart interval, as set by the last DRI segment.
    #[inline]
    pub fn restart_interval(&self) -> Option<u16> {
        self.restart_interval
    }

    pub fn set_restart_interval(&mut self, ri: u16) {
        self.restart_interval = Some(ri);
    }

    /// Returns `true` if the document contains no comments, tables, or frames.
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
            && self.frames.is_empty()
            && self.restart_interval.is_none()
            && self.tables.quantization().iter().next().is_none()
            && self.tables.huffman().iter().next().is_none()
    }
}
