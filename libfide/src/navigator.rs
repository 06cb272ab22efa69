use tracing::debug;

/// Stack of visited page URLs. The top is the page currently shown (or being loaded).
#[derive(Debug, Default, Clone)]
pub struct PageNavigator {
    stack: Vec<String>,
}

impl PageNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: String) {
        self.stack.push(url);
    }

    /// Drops the current page and returns the one before it, which is also removed since
    /// loading it pushes it again. Does nothing with fewer than two entries.
    pub fn pop_to_previous(&mut self) -> Option<String> {
        if self.stack.len() < 2 {
            debug!("No previous page at depth {}", self.stack.len());
            return None;
        }
        self.stack.pop();
        self.stack.pop()
    }

    pub fn reset(&mut self) {
        self.stack.clear();
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }
}
