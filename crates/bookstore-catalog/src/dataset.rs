//! The fixed seed dataset

use bookstore_common::Book;

/// Number of records the seeder writes
pub const SEED_BOOK_COUNT: usize = 12;

#[allow(clippy::too_many_arguments)]
fn book(
    title: &str,
    author: &str,
    genre: &str,
    published_year: i32,
    price: f64,
    in_stock: bool,
    pages: u32,
    publisher: &str,
) -> Book {
    Book {
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        published_year,
        price,
        in_stock,
        pages,
        publisher: publisher.to_string(),
    }
}

/// The twelve books the seeder inserts, in insertion order
pub fn seed_books() -> Vec<Book> {
    vec![
        book("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 12.99, true, 218, "Scribner"),
        book("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 14.99, true, 281, "J.B. Lippincott & Co."),
        book("1984", "George Orwell", "Dystopian", 1949, 10.99, false, 328, "Secker & Warburg"),
        book("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 16.99, true, 310, "George Allen & Unwin"),
        book("Pride and Prejudice", "Jane Austen", "Romance", 1813, 9.99, true, 432, "T. Egerton"),
        book("The Catcher in the Rye", "J.D. Salinger", "Fiction", 1951, 11.99, false, 234, "Little, Brown and Company"),
        book(
            "Harry Potter and the Philosopher's Stone",
            "J.K. Rowling",
            "Fantasy",
            1997,
            19.99,
            true,
            223,
            "Bloomsbury",
        ),
        book("The Da Vinci Code", "Dan Brown", "Mystery", 2003, 15.99, true, 489, "Doubleday"),
        book("The Alchemist", "Paulo Coelho", "Fiction", 1988, 13.99, true, 208, "HarperTorch"),
        book("The Hunger Games", "Suzanne Collins", "Dystopian", 2008, 12.99, true, 374, "Scholastic"),
        book("The Girl on the Train", "Paula Hawkins", "Mystery", 2015, 14.99, true, 336, "Riverhead Books"),
        book("Educated", "Tara Westover", "Memoir", 2018, 16.99, true, 334, "Random House"),
    ]
}
