//! PostgreSQL store backend.
//!
//! Connections come from a `bb8` pool over `tokio-postgres`. The uniqueness
//! invariants live in the schema (`schema.sql`); unique-violation errors are
//! translated into the matching `StoreError` conflict variants so callers
//! can handle lost races explicitly.

use std::collections::HashMap;

use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::info;

use goodshelf_types::{
    AccountStatus, Book, BookId, Genre, GenreId, Page, ReadingStatus, Review,
    ReviewId, ReviewVote, Role, ShelfEntry, User, UserId, UserStats, VoteKind, VoteTally,
};

use crate::error::{Result, StoreError};
use crate::traits::{AccountStore, CatalogStore, ReviewStore, ShelfStore, VoteStore};
use crate::types::{
    BookQuery, BookReview, BookSearchField, BookSort, BookSummary, NewBook, NewUser,
    PasswordUpdate, ReviewQuery, ReviewRecord, ReviewSort, UserFilter,
};

const SCHEMA: &str = include_str!("schema.sql");

type PgPool = Pool<PostgresConnectionManager<NoTls>>;
type PgConn<'a> = bb8::PooledConnection<'a, PostgresConnectionManager<NoTls>>;

/// PostgreSQL store backend.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to the database at `url` and build a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let manager = PostgresConnectionManager::new_from_stringlike(url, NoTls)
            .map_err(StoreError::backend)?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(StoreError::backend)?;
        Ok(Self { pool })
    }

    /// Create the tables and indexes if they do not exist.
    pub async fn initialize(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.batch_execute(SCHEMA)
            .await
            .map_err(StoreError::backend)?;
        info!("database schema initialized");
        Ok(())
    }

    async fn conn(&self) -> Result<PgConn<'_>> {
        self.pool.get().await.map_err(StoreError::backend)
    }
}

/// Translate a unique-violation into the conflict error named by the
/// violated constraint; anything else becomes a backend error.
fn map_db_error(e: tokio_postgres::Error, conflict: StoreError) -> StoreError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        conflict
    } else {
        StoreError::backend(e)
    }
}

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = row.get("role");
    let status: i16 = row.get("status");
    Ok(User {
        id: UserId::new(row.get("id")),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        role: Role::parse(&role).ok_or_else(|| StoreError::InvalidData {
            message: format!("unknown role '{role}'"),
        })?,
        status: AccountStatus::from_i16(status).ok_or_else(|| StoreError::InvalidData {
            message: format!("unknown account status {status}"),
        })?,
        created_at: row.get("created_at"),
    })
}

fn review_from_row(row: &Row) -> Review {
    Review {
        id: ReviewId::new(row.get("id")),
        user_id: UserId::new(row.get("user_id")),
        book_id: BookId::new(row.get("book_id")),
        rating: row.get("rating"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
    }
}

fn vote_from_row(row: &Row) -> Result<ReviewVote> {
    let sentinel: i16 = row.get("vote_kind");
    Ok(ReviewVote {
        id: row.get("id"),
        review_id: ReviewId::new(row.get("review_id")),
        user_id: UserId::new(row.get("user_id")),
        kind: VoteKind::from_i16(sentinel).ok_or_else(|| StoreError::InvalidData {
            message: format!("unknown vote sentinel {sentinel}"),
        })?,
        created_at: row.get("created_at"),
    })
}

fn shelf_from_row(row: &Row) -> Result<ShelfEntry> {
    let status: i16 = row.get("status");
    Ok(ShelfEntry {
        id: row.get("id"),
        user_id: UserId::new(row.get("user_id")),
        book_id: BookId::new(row.get("book_id")),
        status: ReadingStatus::from_i16(status).ok_or_else(|| StoreError::InvalidData {
            message: format!("unknown reading status {status}"),
        })?,
        added_at: row.get("added_at"),
    })
}

fn book_from_row(row: &Row, genre_ids: Vec<GenreId>) -> Book {
    Book {
        id: BookId::new(row.get("id")),
        title: row.get("title"),
        author: row.get("author"),
        description: row.get("description"),
        publish_year: row.get("publish_year"),
        cover_url: row.get("cover_url"),
        genre_ids,
    }
}

impl PostgresStorage {
    async fn genre_links(&self, conn: &PgConn<'_>, book_ids: &[i64]) -> Result<HashMap<i64, Vec<GenreId>>> {
        let rows = conn
            .query(
                "SELECT book_id, genre_id FROM book_genres WHERE book_id = ANY($1) ORDER BY genre_id",
                &[&book_ids],
            )
            .await
            .map_err(StoreError::backend)?;
        let mut links: HashMap<i64, Vec<GenreId>> = HashMap::new();
        for row in rows {
            links
                .entry(row.get("book_id"))
                .or_default()
                .push(GenreId::new(row.get("genre_id")));
        }
        Ok(links)
    }
}

#[async_trait]
impl AccountStore for PostgresStorage {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO users (username, password_hash, password_salt, role, status)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, username, password_hash, password_salt, role, status, created_at",
                &[
                    &user.username,
                    &user.password_hash,
                    &user.password_salt,
                    &user.role.as_str(),
                    &user.status.as_i16(),
                ],
            )
            .await
            .map_err(|e| {
                map_db_error(
                    e,
                    StoreError::UsernameTaken {
                        username: user.username.clone(),
                    },
                )
            })?;
        user_from_row(&row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, username, password_hash, password_salt, role, status, created_at
                 FROM users WHERE id = $1",
                &[&id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, username, password_hash, password_salt, role, status, created_at
                 FROM users WHERE username = $1",
                &[&username],
            )
            .await
            .map_err(StoreError::backend)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_profile(
        &self,
        id: UserId,
        username: &str,
        password: Option<&PasswordUpdate>,
    ) -> Result<User> {
        let conn = self.conn().await?;
        let conflict = StoreError::UsernameTaken {
            username: username.to_string(),
        };
        let row = match password {
            Some(update) => conn
                .query_opt(
                    "UPDATE users
                     SET username = $2, password_hash = $3, password_salt = $4
                     WHERE id = $1
                     RETURNING id, username, password_hash, password_salt, role, status, created_at",
                    &[
                        &id.get(),
                        &username,
                        &update.password_hash,
                        &update.password_salt,
                    ],
                )
                .await
                .map_err(|e| map_db_error(e, conflict))?,
            None => conn
                .query_opt(
                    "UPDATE users SET username = $2 WHERE id = $1
                     RETURNING id, username, password_hash, password_salt, role, status, created_at",
                    &[&id.get(), &username],
                )
                .await
                .map_err(|e| map_db_error(e, conflict))?,
        };
        let row = row.ok_or(StoreError::UserNotFound { id: id.get() })?;
        user_from_row(&row)
    }

    async fn set_status(&self, id: UserId, status: AccountStatus) -> Result<()> {
        let conn = self.conn().await?;
        let updated = conn
            .execute(
                "UPDATE users SET status = $2 WHERE id = $1",
                &[&id.get(), &status.as_i16()],
            )
            .await
            .map_err(StoreError::backend)?;
        if updated == 0 {
            return Err(StoreError::UserNotFound { id: id.get() });
        }
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<()> {
        let conn = self.conn().await?;
        let updated = conn
            .execute(
                "UPDATE users SET role = $2 WHERE id = $1",
                &[&id.get(), &role.as_str()],
            )
            .await
            .map_err(StoreError::backend)?;
        if updated == 0 {
            return Err(StoreError::UserNotFound { id: id.get() });
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let conn = self.conn().await?;
        // Reviews, votes, and shelf entries go with the row via ON DELETE
        // CASCADE; votes on the deleted reviews cascade one level further.
        let deleted = conn
            .execute("DELETE FROM users WHERE id = $1", &[&id.get()])
            .await
            .map_err(StoreError::backend)?;
        Ok(deleted > 0)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Page<User>> {
        let conn = self.conn().await?;

        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let pattern;
        if let Some(term) = &filter.username_contains {
            pattern = format!("%{term}%");
            params.push(&pattern);
            clauses.push(format!("username ILIKE ${}", params.len()));
        }
        let status;
        if let Some(wanted) = filter.status {
            status = wanted.as_i16();
            params.push(&status);
            clauses.push(format!("status = ${}", params.len()));
        }
        let role;
        if let Some(wanted) = filter.role {
            role = wanted.as_str();
            params.push(&role);
            clauses.push(format!("role = ${}", params.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_row = conn
            .query_one(
                &format!("SELECT COUNT(*) FROM users {where_clause}"),
                &params,
            )
            .await
            .map_err(StoreError::backend)?;
        let total = count_row.get::<_, i64>(0) as u64;
        let request = filter.page.clamp_to(total);

        let rows = conn
            .query(
                &format!(
                    "SELECT id, username, password_hash, password_salt, role, status, created_at
                     FROM users {where_clause}
                     ORDER BY id
                     LIMIT {} OFFSET {}",
                    request.per_page,
                    request.offset()
                ),
                &params,
            )
            .await
            .map_err(StoreError::backend)?;
        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(users, total, request))
    }

    async fn user_stats(&self, id: UserId) -> Result<UserStats> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "SELECT
                    (SELECT COUNT(*) FROM reviews WHERE user_id = $1) AS review_count,
                    (SELECT COUNT(*) FROM shelf_entries WHERE user_id = $1) AS shelf_count",
                &[&id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(UserStats {
            review_count: row.get::<_, i64>("review_count") as u64,
            shelf_count: row.get::<_, i64>("shelf_count") as u64,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresStorage {
    async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await.map_err(StoreError::backend)?;
        let row = tx
            .query_one(
                "INSERT INTO books (title, author, description, publish_year, cover_url)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, title, author, description, publish_year, cover_url",
                &[
                    &book.title,
                    &book.author,
                    &book.description,
                    &book.publish_year,
                    &book.cover_url,
                ],
            )
            .await
            .map_err(StoreError::backend)?;
        let book_id: i64 = row.get("id");
        for genre_id in &book.genre_ids {
            tx.execute(
                "INSERT INTO book_genres (book_id, genre_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
                &[&book_id, &genre_id.get()],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    StoreError::GenreNotFound { id: genre_id.get() }
                } else {
                    StoreError::backend(e)
                }
            })?;
        }
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(book_from_row(&row, book.genre_ids.clone()))
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, title, author, description, publish_year, cover_url
                 FROM books WHERE id = $1",
                &[&id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        match row {
            Some(row) => {
                let links = self.genre_links(&conn, &[id.get()]).await?;
                let genres = links.get(&id.get()).cloned().unwrap_or_default();
                Ok(Some(book_from_row(&row, genres)))
            }
            None => Ok(None),
        }
    }

    async fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await.map_err(StoreError::backend)?;
        let row = tx
            .query_opt(
                "UPDATE books
                 SET title = $2, author = $3, description = $4, publish_year = $5, cover_url = $6
                 WHERE id = $1
                 RETURNING id, title, author, description, publish_year, cover_url",
                &[
                    &id.get(),
                    &book.title,
                    &book.author,
                    &book.description,
                    &book.publish_year,
                    &book.cover_url,
                ],
            )
            .await
            .map_err(StoreError::backend)?
            .ok_or(StoreError::BookNotFound { id: id.get() })?;
        tx.execute("DELETE FROM book_genres WHERE book_id = $1", &[&id.get()])
            .await
            .map_err(StoreError::backend)?;
        for genre_id in &book.genre_ids {
            tx.execute(
                "INSERT INTO book_genres (book_id, genre_id) VALUES ($1, $2)",
                &[&id.get(), &genre_id.get()],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    StoreError::GenreNotFound { id: genre_id.get() }
                } else {
                    StoreError::backend(e)
                }
            })?;
        }
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(book_from_row(&row, book.genre_ids.clone()))
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM books WHERE id = $1", &[&id.get()])
            .await
            .map_err(StoreError::backend)?;
        Ok(deleted > 0)
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Page<BookSummary>> {
        let conn = self.conn().await?;

        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let pattern;
        if let Some(term) = &query.search {
            pattern = format!("%{term}%");
            params.push(&pattern);
            let column = match query.search_field {
                BookSearchField::Title => "b.title",
                BookSearchField::Author => "b.author",
            };
            clauses.push(format!("{column} ILIKE ${}", params.len()));
        }
        let genre_id;
        if let Some(genre) = query.genre {
            genre_id = genre.get();
            params.push(&genre_id);
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM book_genres bg WHERE bg.book_id = b.id AND bg.genre_id = ${})",
                params.len()
            ));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_row = conn
            .query_one(
                &format!("SELECT COUNT(*) FROM books b {where_clause}"),
                &params,
            )
            .await
            .map_err(StoreError::backend)?;
        let total = count_row.get::<_, i64>(0) as u64;
        let request = query.page.clamp_to(total);

        let order = match query.sort {
            BookSort::Newest => "b.publish_year DESC NULLS LAST, b.id",
            BookSort::Oldest => "b.publish_year ASC NULLS LAST, b.id",
            BookSort::Title => "LOWER(b.title), b.id",
            BookSort::Author => "LOWER(b.author), b.id",
            BookSort::Rating => "average_rating DESC, b.id",
        };
        let rows = conn
            .query(
                &format!(
                    "SELECT b.id, b.title, b.author, b.description, b.publish_year, b.cover_url,
                            COUNT(r.id) AS review_count,
                            COALESCE(AVG(r.rating)::float8, 0) AS average_rating
                     FROM books b
                     LEFT JOIN reviews r ON r.book_id = b.id
                     {where_clause}
                     GROUP BY b.id
                     ORDER BY {order}
                     LIMIT {} OFFSET {}",
                    request.per_page,
                    request.offset()
                ),
                &params,
            )
            .await
            .map_err(StoreError::backend)?;

        let book_ids: Vec<i64> = rows.iter().map(|row| row.get("id")).collect();
        let mut links = self.genre_links(&conn, &book_ids).await?;
        let summaries = rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("id");
                BookSummary {
                    book: book_from_row(row, links.remove(&id).unwrap_or_default()),
                    average_rating: row.get("average_rating"),
                    review_count: row.get::<_, i64>("review_count") as u64,
                }
            })
            .collect();
        Ok(Page::new(summaries, total, request))
    }

    async fn create_genre(&self, name: &str) -> Result<Genre> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO genres (name) VALUES ($1) RETURNING id, name",
                &[&name],
            )
            .await
            .map_err(|e| {
                map_db_error(
                    e,
                    StoreError::GenreExists {
                        name: name.to_string(),
                    },
                )
            })?;
        Ok(Genre {
            id: GenreId::new(row.get("id")),
            name: row.get("name"),
        })
    }

    async fn get_genre(&self, id: GenreId) -> Result<Option<Genre>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt("SELECT id, name FROM genres WHERE id = $1", &[&id.get()])
            .await
            .map_err(StoreError::backend)?;
        Ok(row.map(|row| Genre {
            id: GenreId::new(row.get("id")),
            name: row.get("name"),
        }))
    }

    async fn rename_genre(&self, id: GenreId, name: &str) -> Result<Genre> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "UPDATE genres SET name = $2 WHERE id = $1 RETURNING id, name",
                &[&id.get(), &name],
            )
            .await
            .map_err(|e| {
                map_db_error(
                    e,
                    StoreError::GenreExists {
                        name: name.to_string(),
                    },
                )
            })?
            .ok_or(StoreError::GenreNotFound { id: id.get() })?;
        Ok(Genre {
            id: GenreId::new(row.get("id")),
            name: row.get("name"),
        })
    }

    async fn delete_genre(&self, id: GenreId) -> Result<bool> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM genres WHERE id = $1", &[&id.get()])
            .await
            .map_err(StoreError::backend)?;
        Ok(deleted > 0)
    }

    async fn list_genres(&self) -> Result<Vec<Genre>> {
        let conn = self.conn().await?;
        let rows = conn
            .query("SELECT id, name FROM genres ORDER BY LOWER(name)", &[])
            .await
            .map_err(StoreError::backend)?;
        Ok(rows
            .iter()
            .map(|row| Genre {
                id: GenreId::new(row.get("id")),
                name: row.get("name"),
            })
            .collect())
    }
}

#[async_trait]
impl ReviewStore for PostgresStorage {
    async fn upsert_review(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: i16,
        comment: &str,
    ) -> Result<(Review, bool)> {
        let conn = self.conn().await?;
        // xmax = 0 distinguishes a fresh insert from a conflict update.
        let row = conn
            .query_one(
                "INSERT INTO reviews (user_id, book_id, rating, comment)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (user_id, book_id) DO UPDATE
                 SET rating = excluded.rating, comment = excluded.comment, created_at = now()
                 RETURNING id, user_id, book_id, rating, comment, created_at,
                           (xmax = 0) AS inserted",
                &[&user_id.get(), &book_id.get(), &rating, &comment],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    StoreError::BookNotFound { id: book_id.get() }
                } else {
                    StoreError::backend(e)
                }
            })?;
        let created: bool = row.get("inserted");
        Ok((review_from_row(&row), created))
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, user_id, book_id, rating, comment, created_at
                 FROM reviews WHERE id = $1",
                &[&id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(row.as_ref().map(review_from_row))
    }

    async fn find_review(&self, user_id: UserId, book_id: BookId) -> Result<Option<Review>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, user_id, book_id, rating, comment, created_at
                 FROM reviews WHERE user_id = $1 AND book_id = $2",
                &[&user_id.get(), &book_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(row.as_ref().map(review_from_row))
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM reviews WHERE id = $1", &[&id.get()])
            .await
            .map_err(StoreError::backend)?;
        Ok(deleted > 0)
    }

    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<BookReview>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT r.id, r.user_id, r.book_id, r.rating, r.comment, r.created_at,
                        u.username
                 FROM reviews r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.book_id = $1
                 ORDER BY r.created_at DESC",
                &[&book_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(rows
            .iter()
            .map(|row| BookReview {
                review: review_from_row(row),
                username: row.get("username"),
            })
            .collect())
    }

    async fn reviews_by_user(&self, user_id: UserId) -> Result<Vec<Review>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT id, user_id, book_id, rating, comment, created_at
                 FROM reviews WHERE user_id = $1
                 ORDER BY created_at DESC",
                &[&user_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(rows.iter().map(review_from_row).collect())
    }

    async fn review_counts(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, u64>> {
        let conn = self.conn().await?;
        let ids: Vec<i64> = user_ids.iter().map(|id| id.get()).collect();
        let rows = conn
            .query(
                "SELECT user_id, COUNT(*) AS review_count
                 FROM reviews WHERE user_id = ANY($1)
                 GROUP BY user_id",
                &[&ids],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(rows
            .iter()
            .map(|row| {
                (
                    UserId::new(row.get("user_id")),
                    row.get::<_, i64>("review_count") as u64,
                )
            })
            .collect())
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<ReviewRecord>> {
        let conn = self.conn().await?;

        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let rating;
        if let Some(wanted) = query.rating {
            rating = wanted;
            params.push(&rating);
            clauses.push(format!("r.rating = ${}", params.len()));
        }
        let pattern;
        if let Some(term) = &query.search {
            pattern = format!("%{term}%");
            params.push(&pattern);
            let n = params.len();
            clauses.push(format!(
                "(b.title ILIKE ${n} OR b.author ILIKE ${n} OR u.username ILIKE ${n} OR r.comment ILIKE ${n})"
            ));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_row = conn
            .query_one(
                &format!(
                    "SELECT COUNT(*)
                     FROM reviews r
                     JOIN books b ON b.id = r.book_id
                     JOIN users u ON u.id = r.user_id
                     {where_clause}"
                ),
                &params,
            )
            .await
            .map_err(StoreError::backend)?;
        let total = count_row.get::<_, i64>(0) as u64;
        let request = query.page.clamp_to(total);

        let order = match query.sort {
            ReviewSort::Newest => "r.created_at DESC",
            ReviewSort::Oldest => "r.created_at ASC",
            ReviewSort::Highest => "r.rating DESC, r.created_at DESC",
            ReviewSort::Lowest => "r.rating ASC, r.created_at DESC",
        };
        let rows = conn
            .query(
                &format!(
                    "SELECT r.id, r.user_id, r.book_id, r.rating, r.comment, r.created_at,
                            b.title AS book_title, b.author AS book_author, u.username
                     FROM reviews r
                     JOIN books b ON b.id = r.book_id
                     JOIN users u ON u.id = r.user_id
                     {where_clause}
                     ORDER BY {order}
                     LIMIT {} OFFSET {}",
                    request.per_page,
                    request.offset()
                ),
                &params,
            )
            .await
            .map_err(StoreError::backend)?;
        let records = rows
            .iter()
            .map(|row| ReviewRecord {
                review: review_from_row(row),
                book_title: row.get("book_title"),
                book_author: row.get("book_author"),
                username: row.get("username"),
            })
            .collect();
        Ok(Page::new(records, total, request))
    }
}

#[async_trait]
impl VoteStore for PostgresStorage {
    async fn vote_of(&self, user_id: UserId, review_id: ReviewId) -> Result<Option<ReviewVote>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, review_id, user_id, vote_kind, created_at
                 FROM review_votes WHERE user_id = $1 AND review_id = $2",
                &[&user_id.get(), &review_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        row.as_ref().map(vote_from_row).transpose()
    }

    async fn insert_vote(
        &self,
        user_id: UserId,
        review_id: ReviewId,
        kind: VoteKind,
    ) -> Result<ReviewVote> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO review_votes (review_id, user_id, vote_kind)
                 VALUES ($1, $2, $3)
                 RETURNING id, review_id, user_id, vote_kind, created_at",
                &[&review_id.get(), &user_id.get(), &kind.as_i16()],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    StoreError::ReviewNotFound { id: review_id.get() }
                } else {
                    map_db_error(
                        e,
                        StoreError::DuplicateVote {
                            user_id: user_id.get(),
                            review_id: review_id.get(),
                        },
                    )
                }
            })?;
        vote_from_row(&row)
    }

    async fn set_vote_kind(&self, vote_id: i64, kind: VoteKind) -> Result<()> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE review_votes SET vote_kind = $2, created_at = now() WHERE id = $1",
            &[&vote_id, &kind.as_i16()],
        )
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn delete_vote(&self, vote_id: i64) -> Result<bool> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute("DELETE FROM review_votes WHERE id = $1", &[&vote_id])
            .await
            .map_err(StoreError::backend)?;
        Ok(deleted > 0)
    }

    async fn tally(&self, review_id: ReviewId) -> Result<VoteTally> {
        let conn = self.conn().await?;
        // vote_kind <> 1 also sweeps up the legacy downvote sentinel 2.
        let row = conn
            .query_one(
                "SELECT COUNT(*) FILTER (WHERE vote_kind = 1) AS upvotes,
                        COUNT(*) FILTER (WHERE vote_kind <> 1) AS downvotes
                 FROM review_votes WHERE review_id = $1",
                &[&review_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(VoteTally::new(
            row.get::<_, i64>("upvotes") as u32,
            row.get::<_, i64>("downvotes") as u32,
        ))
    }

    async fn votes_of_user(
        &self,
        user_id: UserId,
        review_ids: &[ReviewId],
    ) -> Result<HashMap<ReviewId, VoteKind>> {
        let conn = self.conn().await?;
        let ids: Vec<i64> = review_ids.iter().map(|id| id.get()).collect();
        let rows = conn
            .query(
                "SELECT review_id, vote_kind FROM review_votes
                 WHERE user_id = $1 AND review_id = ANY($2)",
                &[&user_id.get(), &ids],
            )
            .await
            .map_err(StoreError::backend)?;
        let mut votes = HashMap::new();
        for row in rows {
            let sentinel: i16 = row.get("vote_kind");
            if let Some(kind) = VoteKind::from_i16(sentinel) {
                votes.insert(ReviewId::new(row.get("review_id")), kind);
            }
        }
        Ok(votes)
    }
}

#[async_trait]
impl ShelfStore for PostgresStorage {
    async fn upsert_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
        status: ReadingStatus,
    ) -> Result<ShelfEntry> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO shelf_entries (user_id, book_id, status)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (user_id, book_id) DO UPDATE
                 SET status = excluded.status, added_at = now()
                 RETURNING id, user_id, book_id, status, added_at",
                &[&user_id.get(), &book_id.get(), &status.as_i16()],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    StoreError::BookNotFound { id: book_id.get() }
                } else {
                    StoreError::backend(e)
                }
            })?;
        shelf_from_row(&row)
    }

    async fn entry_for(&self, user_id: UserId, book_id: BookId) -> Result<Option<ShelfEntry>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, user_id, book_id, status, added_at
                 FROM shelf_entries WHERE user_id = $1 AND book_id = $2",
                &[&user_id.get(), &book_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        row.as_ref().map(shelf_from_row).transpose()
    }

    async fn remove_entry(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM shelf_entries WHERE user_id = $1 AND book_id = $2",
                &[&user_id.get(), &book_id.get()],
            )
            .await
            .map_err(StoreError::backend)?;
        Ok(deleted > 0)
    }

    async fn list_shelf(
        &self,
        user_id: UserId,
        status: Option<ReadingStatus>,
    ) -> Result<Vec<ShelfEntry>> {
        let conn = self.conn().await?;
        let rows = match status {
            Some(wanted) => {
                conn.query(
                    "SELECT id, user_id, book_id, status, added_at
                     FROM shelf_entries WHERE user_id = $1 AND status = $2
                     ORDER BY added_at DESC",
                    &[&user_id.get(), &wanted.as_i16()],
                )
                .await
            }
            None => {
                conn.query(
                    "SELECT id, user_id, book_id, status, added_at
                     FROM shelf_entries WHERE user_id = $1
                     ORDER BY added_at DESC",
                    &[&user_id.get()],
                )
                .await
            }
        }
        .map_err(StoreError::backend)?;
        rows.iter().map(shelf_from_row).collect()
    }
}
