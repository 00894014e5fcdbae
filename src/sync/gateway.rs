//! Conflict-safe writes against the catalog. Every function takes the run
//! transaction's connection; nothing here commits. Generated identities come
//! back to the caller so the in-memory index can be extended immediately.

use anyhow::{Context, Result};
use sqlx::{PgConnection, Postgres, QueryBuilder, Row};
use tracing::debug;

/// Credit role codes as stored: A acting, D directing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditedAs {
    Acting,
    Directing,
}

impl CreditedAs {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditedAs::Acting => "A",
            CreditedAs::Directing => "D",
        }
    }
}

/// A movie row ready for insertion, bounded fields already truncated.
#[derive(Debug, Clone)]
pub struct NewMovie<'a> {
    pub title: &'a str,
    pub country: &'a str,
    pub year_released: i32,
    pub runtime: Option<i32>,
}

/// A person row ready for upsert, name parts already truncated.
#[derive(Debug, Clone)]
pub struct NewPerson<'a> {
    pub first_name: &'a str,
    pub surname: &'a str,
    pub born: i32,
    pub died: Option<i32>,
    pub gender: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRow {
    pub movie_id: i32,
    pub person_id: i32,
    pub credited_as: CreditedAs,
}

/// Plain insert returning the generated identity. The caller has already
/// proven non-existence through the index; a violation here is a fault, not
/// a rejection, and aborts the run.
pub async fn insert_movie(conn: &mut PgConnection, movie: &NewMovie<'_>) -> Result<i32> {
    let row = sqlx::query(
        "INSERT INTO movies (title, country, year_released, runtime) \
         VALUES ($1, $2, $3, $4) RETURNING movieid",
    )
    .bind(movie.title)
    .bind(movie.country)
    .bind(movie.year_released)
    .bind(movie.runtime)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("inserting movie {:?} ({})", movie.title, movie.year_released))?;
    Ok(row.get("movieid"))
}

/// Insert-or-refresh keyed on (surname, first_name); on conflict only the
/// gender is refreshed, biographical fields keep their first-seen values.
///
/// Two-step contract: if the upsert yields no row, a direct lookup by the
/// same key resolves the id before anything else happens.
pub async fn upsert_person(conn: &mut PgConnection, person: &NewPerson<'_>) -> Result<i32> {
    let upserted = sqlx::query(
        "INSERT INTO people (first_name, surname, born, died, gender) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (surname, first_name) \
         DO UPDATE SET gender = EXCLUDED.gender \
         RETURNING peopleid",
    )
    .bind(person.first_name)
    .bind(person.surname)
    .bind(person.born)
    .bind(person.died)
    .bind(person.gender)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("upserting person {} {}", person.first_name, person.surname))?;
    if let Some(row) = upserted {
        return Ok(row.get("peopleid"));
    }
    debug!(
        surname = person.surname,
        "person upsert yielded no row; resolving by name pair"
    );
    let row = sqlx::query("SELECT peopleid FROM people WHERE surname = $1 AND first_name = $2")
        .bind(person.surname)
        .bind(person.first_name)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| {
            format!(
                "resolving person {} {} after upsert",
                person.first_name, person.surname
            )
        })?;
    Ok(row.get("peopleid"))
}

/// One movie's alternate titles in a single batched statement; duplicates
/// already in the catalog are absorbed by the unique (movieid, title) pair.
/// Returns how many rows actually landed.
pub async fn insert_alt_titles(
    conn: &mut PgConnection,
    movie_id: i32,
    titles: &[String],
) -> Result<u64> {
    if titles.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("INSERT INTO alt_titles (movieid, title) ");
    qb.push_values(titles, |mut b, title| {
        b.push_bind(movie_id).push_bind(title);
    });
    qb.push(" ON CONFLICT (movieid, title) DO NOTHING");
    let result = qb
        .build()
        .execute(&mut *conn)
        .await
        .with_context(|| format!("inserting alternate titles for movie {movie_id}"))?;
    Ok(result.rows_affected())
}

/// One movie's credits in a single batched statement; repeats of the full
/// (movie, person, role) key are absorbed.
pub async fn insert_credits(conn: &mut PgConnection, rows: &[CreditRow]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("INSERT INTO credits (movieid, peopleid, credited_as) ");
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.movie_id)
            .push_bind(r.person_id)
            .push_bind(r.credited_as.as_str());
    });
    qb.push(" ON CONFLICT (movieid, peopleid, credited_as) DO NOTHING");
    let result = qb
        .build()
        .execute(&mut *conn)
        .await
        .context("inserting credits")?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_are_single_chars() {
        assert_eq!(CreditedAs::Acting.as_str(), "A");
        assert_eq!(CreditedAs::Directing.as_str(), "D");
    }
}
