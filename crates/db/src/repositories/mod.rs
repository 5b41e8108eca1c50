//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod comment_repo;
pub mod gallery_repo;
pub mod image_repo;
pub mod star_repo;

pub use comment_repo::CommentRepo;
pub use gallery_repo::GalleryRepo;
pub use image_repo::ImageRepo;
pub use star_repo::StarRepo;
