use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use cashflow_vision::{
    Category, Frequency, NewBudget, NewRecurringExpense, NewUser, PasswordHash, Transaction,
    TransactionType, ValidatedPassword, create_budget, create_recurring_expense,
    create_transaction, create_user, initialize_db, link_transactions_to_budget,
};

/// A utility for creating a test database for the REST API server of Cashflow Vision.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
///
/// The demo user can log in as "demo" with the password "test".
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

    println!("Creating test user...");
    let now = OffsetDateTime::now_utc();
    let user = create_user(
        NewUser {
            name: "Demo User".to_owned(),
            username: "demo".to_owned(),
            email: "demo@example.com".to_owned(),
            password_hash: PasswordHash::new(
                &ValidatedPassword::new_unchecked("test"),
                PasswordHash::DEFAULT_COST,
            )?,
        },
        now,
        &conn,
    )?;

    println!("Creating transactions...");
    let today = now.date();
    let samples = [
        ("Salary", 4200.0, TransactionType::Income, Category::Salary, 14),
        ("Groceries", 86.4, TransactionType::Expense, Category::Food, 2),
        ("Bus pass", 45.0, TransactionType::Expense, Category::Transport, 5),
        ("Power bill", 120.0, TransactionType::Expense, Category::Bills, 9),
        ("Cinema", 24.0, TransactionType::Expense, Category::Entertainment, 11),
        ("Takeaways", 32.5, TransactionType::Expense, Category::Food, 20),
    ];
    for (description, amount, transaction_type, category, days_ago) in samples {
        create_transaction(
            user.id,
            Transaction::build(amount, today - Duration::days(days_ago), description)
                .transaction_type(transaction_type)
                .category(category),
            &conn,
        )?;
    }

    println!("Creating budget...");
    let budget = create_budget(
        user.id,
        NewBudget {
            name: "Groceries".to_owned(),
            category: Category::Food,
            amount: 400.0,
            period: Frequency::Monthly,
            start_date: today,
            end_date: today + Duration::days(365),
            currency: "USD".to_owned(),
        },
        &conn,
    )?;
    link_transactions_to_budget(&budget, &conn)?;

    println!("Creating recurring expense...");
    create_recurring_expense(
        user.id,
        NewRecurringExpense {
            description: "Rent".to_owned(),
            amount: 1800.0,
            category: Category::Bills,
            frequency: Frequency::Monthly,
            start_date: today,
            end_date: None,
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
