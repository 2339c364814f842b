//! PostgreSQL store tests
//!
//! Need a disposable database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;

use catalogue_server::{
    error::AppError,
    models::{
        author::CreateAuthor,
        book::{CreateBook, UpdateBook},
        book_instance::{CreateBookInstance, LoanStatus},
        genre::GenreInput,
        pagination::PageRequest,
    },
    repository::Repository,
};

async fn repository() -> Repository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    sqlx::query("TRUNCATE book_instances, book_genres, books, authors, genres, languages, borrowers RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to reset tables");
    Repository::postgres(pool)
}

fn new_book(title: &str, isbn: &str, author_id: Option<i32>, genre_ids: Vec<i32>) -> CreateBook {
    CreateBook {
        title: title.to_string(),
        author_id,
        summary: String::new(),
        isbn: isbn.to_string(),
        genre_ids,
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_referential_policies() {
    let repo = repository().await;

    let author = repo
        .authors
        .create(&CreateAuthor {
            first_name: "Frank".into(),
            last_name: "Herbert".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1920, 10, 8),
            date_of_death: None,
        })
        .await
        .unwrap();
    let genre = repo
        .genres
        .create(&GenreInput { name: "Science Fiction".into() })
        .await
        .unwrap();
    let book = repo
        .books
        .create(&new_book("Dune", "9780441013593", Some(author.id), vec![genre.id]))
        .await
        .unwrap();
    assert_eq!(book.display_genre(), "Science Fiction");

    let copy = repo
        .instances
        .create(&CreateBookInstance {
            book_id: book.id,
            imprint: "Ace, 2005".into(),
            due_back: None,
            language_id: None,
            borrower_id: None,
            status: LoanStatus::Available,
        })
        .await
        .unwrap();

    let err = repo.books.delete(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::ReferentialConflict(_)));

    repo.genres.delete(genre.id).await.unwrap();
    repo.authors.delete(author.id).await.unwrap();
    let book = repo.books.get(book.id).await.unwrap();
    assert!(book.genres.is_empty());
    assert_eq!(book.author_id, None);

    repo.instances.delete(copy.id).await.unwrap();
    repo.books.delete(book.id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_isbn_uniqueness() {
    let repo = repository().await;
    repo.books
        .create(&new_book("Emma", "9780141439587", None, vec![]))
        .await
        .unwrap();
    let other = repo
        .books
        .create(&new_book("Persuasion", "9780141439686", None, vec![]))
        .await
        .unwrap();

    let err = repo
        .books
        .create(&new_book("Emma", "9780141439587", None, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UniquenessViolation(_)));

    let patch = UpdateBook {
        isbn: Some("9780141439587".into()),
        ..Default::default()
    };
    let err = repo.books.update(other.id, &patch).await.unwrap_err();
    assert!(matches!(err, AppError::UniquenessViolation(_)));
}

#[tokio::test]
#[ignore]
async fn test_on_loan_listing_order() {
    let repo = repository().await;
    let book = repo
        .books
        .create(&new_book("Beloved", "9781400033416", None, vec![]))
        .await
        .unwrap();

    let dates = [
        NaiveDate::from_ymd_opt(2030, 3, 1),
        None,
        NaiveDate::from_ymd_opt(2030, 1, 1),
    ];
    for due_back in dates {
        repo.instances
            .create(&CreateBookInstance {
                book_id: book.id,
                imprint: String::new(),
                due_back,
                language_id: None,
                borrower_id: None,
                status: LoanStatus::OnLoan,
            })
            .await
            .unwrap();
    }

    let page = PageRequest::default().resolve(20, 100);
    let (items, total) = repo
        .instances
        .list_by_status(LoanStatus::OnLoan, None, page)
        .await
        .unwrap();
    let due: Vec<Option<NaiveDate>> = items.iter().map(|d| d.instance.due_back).collect();
    assert_eq!(total, 3);
    assert_eq!(
        due,
        vec![
            NaiveDate::from_ymd_opt(2030, 1, 1),
            NaiveDate::from_ymd_opt(2030, 3, 1),
            None
        ]
    );
}
