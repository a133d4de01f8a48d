//! Duplicate stages: the upload's bytes already belong to a photo.

use super::standalone::SetHighlighted;
use super::{Chain, DuplicateState, Flow, PipelineContext, Stage};
use crate::error::Result;
use crate::repository::variant_sizes;

/// The duplicate chain in its fixed order.
pub fn chain() -> Chain<DuplicateState> {
    Chain::new("duplicate")
        .stage(LinkToAlbum)
        .stage(SetHighlighted)
        .stage(SaveDuplicate)
}

/// Add the requested album to the existing photo.
pub struct LinkToAlbum;

impl Stage<DuplicateState> for LinkToAlbum {
    fn name(&self) -> &'static str {
        "link_to_album"
    }

    fn handle(&self, state: &mut DuplicateState, _ctx: &PipelineContext) -> Result<Flow> {
        if let Some(album) = &state.album {
            if !state.photo.albums.contains(album) {
                state.photo.albums.push(album.clone());
                state.linked_album = Some(album.clone());
                tracing::debug!(photo = %state.photo.id, album = %album, "Linked duplicate to album");
            }
        }
        Ok(Flow::Continue)
    }
}

/// Persist the existing photo and account for a newly linked album.
pub struct SaveDuplicate;

impl Stage<DuplicateState> for SaveDuplicate {
    fn name(&self) -> &'static str {
        "save_duplicate"
    }

    fn handle(&self, state: &mut DuplicateState, ctx: &PipelineContext) -> Result<Flow> {
        ctx.repository.update(&state.photo)?;
        if let Some(album) = &state.linked_album {
            ctx.repository
                .increment_album_statistics(album, &variant_sizes(&state.photo))?;
        }

        if state.import_mode.delete_imported {
            if let Err(e) = state.original_upload.delete() {
                ctx.reporter.report("delete_imported_file", &e);
            }
        }
        tracing::info!(photo = %state.photo.id, "Upload matched an existing photo");
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::NativeLocalFile;
    use crate::pipeline::tests::context;
    use crate::pipeline::InitState;
    use crate::types::{AlbumId, ImageDimension, ImportMode, ImportParam, Photo, PhotoId, SizeVariantType};

    fn existing(ctx: &PipelineContext) -> Photo {
        let mut photo = Photo::new(PhotoId::from("existing"), 1);
        photo.checksum = "abc".to_string();
        photo.albums = vec![AlbumId::new("home")];
        photo.size_variants.create(
            SizeVariantType::Original,
            "original/x.jpg".to_string(),
            ImageDimension::zero(),
            1000,
        );
        ctx.repository.insert(&photo).unwrap();
        photo
    }

    fn state(dir: &std::path::Path, param: ImportParam, photo: Photo) -> DuplicateState {
        let path = dir.join("again.jpg");
        std::fs::write(&path, b"bytes").unwrap();
        DuplicateState::from_init(InitState::new(Box::new(NativeLocalFile::new(path)), param), photo)
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(
            chain().stage_names(),
            vec!["link_to_album", "set_highlighted", "save_duplicate"]
        );
    }

    #[test]
    fn test_links_new_album_and_counts_it() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context();
        let photo = existing(&ctx);
        let mut param = ImportParam::new(ImportMode::default(), 1);
        param.album = Some(AlbumId::new("trip"));
        param.is_highlighted = true;

        let mut state = state(dir.path(), param, photo);
        chain().run(&mut state, &ctx).unwrap();

        let saved = ctx.repository.get(&PhotoId::from("existing")).unwrap().unwrap();
        assert_eq!(saved.albums, vec![AlbumId::new("home"), AlbumId::new("trip")]);
        assert!(saved.is_highlighted);
        let stats = ctx.repository.album_statistics(&AlbumId::new("trip")).unwrap();
        assert_eq!(stats.size_original, 1000);
        assert!(dir.path().join("again.jpg").exists());
    }

    #[test]
    fn test_known_album_is_not_counted_twice() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context();
        let photo = existing(&ctx);
        let mode = ImportMode {
            delete_imported: true,
            ..Default::default()
        };
        let mut param = ImportParam::new(mode, 1);
        param.album = Some(AlbumId::new("home"));

        let mut state = state(dir.path(), param, photo);
        chain().run(&mut state, &ctx).unwrap();

        assert!(state.linked_album.is_none());
        let stats = ctx.repository.album_statistics(&AlbumId::new("home")).unwrap();
        assert_eq!(stats.total(), 0);
        assert!(!dir.path().join("again.jpg").exists());
    }
}
