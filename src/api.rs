use crate::db::{Article, ArticleId, ArticleWithNote, Note, NoteFields, NoteId, Store};
use crate::error::ApiError;

/// Read/annotate surface over a [`Store`].
pub struct Articles<'a> {
    store: &'a Store,
}

impl<'a> Articles<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn unsaved(&self) -> Result<Vec<Article>, ApiError> {
        Ok(self.store.list_unsaved()?)
    }

    pub fn all(&self) -> Result<Vec<Article>, ApiError> {
        Ok(self.store.list_all()?)
    }

    pub fn get(&self, id: ArticleId) -> Result<ArticleWithNote, ApiError> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Create a note from `fields` and make it the article's note.
    pub fn annotate(&self, id: ArticleId, fields: &NoteFields) -> Result<Article, ApiError> {
        Ok(self.store.annotate(id, fields)?)
    }

    /// Create a note without attaching it anywhere.
    pub fn create_note(&self, fields: &NoteFields) -> Result<Note, ApiError> {
        Ok(self.store.create_note(fields)?)
    }

    pub fn attach(&self, id: ArticleId, note_id: NoteId) -> Result<Article, ApiError> {
        Ok(self.store.attach_note(id, note_id)?)
    }

    pub fn set_saved(&self, id: ArticleId, saved: bool) -> Result<Article, ApiError> {
        Ok(self.store.set_saved(id, saved)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::DedupPolicy;
    use crate::parser::Candidate;

    fn store_with(titles: &[&str]) -> Store {
        let store = Store::open_in_memory().unwrap();
        let batch: Vec<Candidate> = titles
            .iter()
            .map(|t| Candidate {
                title: t.to_string(),
                link: None,
            })
            .collect();
        store.upsert_all(&batch, None, DedupPolicy::Append).unwrap();
        store
    }

    #[test]
    fn missing_id_maps_to_not_found() {
        let store = store_with(&["one"]);
        let api = Articles::new(&store);
        assert!(matches!(api.get(77), Err(ApiError::NotFound(77))));
        assert!(matches!(
            api.annotate(77, &NoteFields::default()),
            Err(ApiError::NotFound(77))
        ));
        assert!(matches!(api.set_saved(77, true), Err(ApiError::NotFound(77))));
    }

    #[test]
    fn annotate_then_get_returns_note_fields() {
        let store = store_with(&["one", "two"]);
        let api = Articles::new(&store);
        let id = api.all().unwrap()[1].id;
        let fields = NoteFields {
            title: "Swell".to_string(),
            body: "Building through the afternoon".to_string(),
        };
        let updated = api.annotate(id, &fields).unwrap();
        assert!(updated.note_id.is_some());

        let got = api.get(id).unwrap();
        let note = got.note.unwrap();
        assert_eq!(
            NoteFields {
                title: note.title,
                body: note.body
            },
            fields
        );
    }

    #[test]
    fn two_step_attach_matches_annotate() {
        let store = store_with(&["one"]);
        let api = Articles::new(&store);
        let id = api.all().unwrap()[0].id;
        let note = api
            .create_note(&NoteFields {
                title: "Tide".to_string(),
                body: "Low at 6am".to_string(),
            })
            .unwrap();
        assert!(matches!(api.attach(99, note.id), Err(ApiError::NotFound(99))));

        let updated = api.attach(id, note.id).unwrap();
        assert_eq!(updated.note_id, Some(note.id));
        let resolved = api.get(id).unwrap().note.unwrap();
        assert_eq!(resolved.id, note.id);
        assert_eq!(resolved.body, "Low at 6am");
    }

    #[test]
    fn attach_unknown_note_is_not_found() {
        let store = store_with(&["one"]);
        let api = Articles::new(&store);
        let id = api.all().unwrap()[0].id;
        assert!(matches!(
            api.attach(id, 12345),
            Err(ApiError::NoteNotFound(12345))
        ));
        assert!(api.get(id).unwrap().note.is_none());
    }

    #[test]
    fn saving_moves_article_out_of_unsaved() {
        let store = store_with(&["one", "two", "three"]);
        let api = Articles::new(&store);
        let first = api.all().unwrap()[0].id;
        api.set_saved(first, true).unwrap();
        let unsaved: Vec<String> = api.unsaved().unwrap().into_iter().map(|a| a.title).collect();
        assert_eq!(unsaved, vec!["two", "three"]);

        api.set_saved(first, false).unwrap();
        assert_eq!(api.unsaved().unwrap().len(), 3);
    }
}
