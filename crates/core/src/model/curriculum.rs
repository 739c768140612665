/// The course book a student works through.
///
/// Every student currently studies the same publication, so there is a single
/// well-known default; the type exists so the rest of the code never hardcodes
/// the book name or lesson count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    name: String,
    total_lessons: u32,
}

impl Curriculum {
    /// The standard study publication.
    #[must_use]
    pub fn default_book() -> Self {
        Self {
            name: "Seja Feliz Para Sempre!".to_owned(),
            total_lessons: 60,
        }
    }

    // Accessors
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn total_lessons(&self) -> u32 {
        self.total_lessons
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
