//! Offset pagination bookkeeping for one remote listing.

use shared::protocol::PageRequest;

use crate::error::SourceKind;

/// Tracks how far a listing has been read. The next offset advances by the number of rows
/// the server returned, not by how many survived de-duplication, so dropped repeats never
/// cause the same page to be requested again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    next_offset: u32,
    total: Option<u32>,
    exhausted: bool,
}

impl PageCursor {
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn has_more(&self) -> bool {
        if self.exhausted {
            return false;
        }
        match self.total {
            Some(total) => self.next_offset < total,
            None => true,
        }
    }

    pub fn advance(&mut self, returned: usize, total: u32) {
        if returned == 0 {
            self.exhausted = true;
        }
        self.next_offset = self.next_offset.saturating_add(returned as u32);
        self.total = Some(total);
    }
}

/// One paginated listing plus its in-flight and error state.
#[derive(Debug, Clone)]
pub struct PaginatedSource {
    kind: SourceKind,
    page_size: u32,
    cursor: PageCursor,
    in_flight: Option<PageRequest>,
    last_error: Option<String>,
}

impl PaginatedSource {
    pub fn new(kind: SourceKind, page_size: u32) -> Self {
        Self {
            kind,
            page_size: page_size.max(1),
            cursor: PageCursor::default(),
            in_flight: None,
            last_error: None,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Reserves the next page. Offsets only advance after the previous page was observed,
    /// so this returns `None` while a request is outstanding or once the listing is read.
    pub fn begin(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || !self.cursor.has_more() {
            return None;
        }
        let request = PageRequest::new(self.cursor.next_offset(), self.page_size);
        self.in_flight = Some(request);
        Some(request)
    }

    pub fn finish(&mut self, returned: usize, total: u32) {
        self.in_flight = None;
        self.last_error = None;
        self.cursor.advance(returned, total);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.in_flight = None;
        self.last_error = Some(message.into());
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.kind, self.page_size);
    }
}
