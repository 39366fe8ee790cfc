use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use expense_tracker::{
    Category, ExpenseKind, NewExpense, NewUser, PasswordHash, RecurringFrequency,
    ValidatedPassword, create_expense, create_user, initialize_db,
};

/// A utility for creating a test database for the REST API server of expense_tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_PASSWORD: &str = "Demo1234";

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo user {DEMO_EMAIL} with the password {DEMO_PASSWORD}...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(DEMO_PASSWORD),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(
        NewUser {
            name: "Demo User".to_owned(),
            email: DEMO_EMAIL.to_owned(),
            password_hash,
        },
        &conn,
    )?;

    println!("Creating sample expenses...");

    let today = OffsetDateTime::now_utc().date();
    let mut expense_count = 0;

    for months_ago in 0..6 {
        let month_start = today - Duration::days(30 * months_ago);

        let mut salary = NewExpense::build(
            "Salary",
            4200.0,
            ExpenseKind::Income,
            Category::Salary,
            month_start,
        );
        salary.is_recurring = true;
        salary.recurring_frequency = Some(RecurringFrequency::Monthly);

        let mut rent = NewExpense::build(
            "Rent",
            1500.0,
            ExpenseKind::Expense,
            Category::Utilities,
            month_start - Duration::days(1),
        );
        rent.is_recurring = true;
        rent.recurring_frequency = Some(RecurringFrequency::Monthly);

        let mut groceries = NewExpense::build(
            "Groceries",
            180.0 + 12.5 * months_ago as f64,
            ExpenseKind::Expense,
            Category::Food,
            month_start - Duration::days(5),
        );
        groceries.tags = vec!["supermarket".to_owned()];

        let mut cinema = NewExpense::build(
            "Cinema",
            32.0,
            ExpenseKind::Expense,
            Category::Entertainment,
            month_start - Duration::days(10),
        );
        cinema.description = "Weekend movie night".to_owned();

        let bus = NewExpense::build(
            "Bus pass",
            55.0,
            ExpenseKind::Expense,
            Category::Transport,
            month_start - Duration::days(14),
        );

        for new_expense in [salary, rent, groceries, cinema, bus] {
            create_expense(user.id, new_expense, &conn)?;
            expense_count += 1;
        }
    }

    println!("Created {expense_count} expenses. Success!");

    Ok(())
}
