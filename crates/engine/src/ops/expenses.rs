use uuid::Uuid;

use crate::{
    EngineEvent, Expense, ExpenseFilter, ExpenseOwner, ExpensePatch, NewExpense, ResultEngine,
    debt, ledger, repository::Changes,
};

use super::Engine;

impl Engine {
    /// Add an expense to a flight or, with timing `before`, to a driver's pocket.
    ///
    /// Pocket expenses are deducted from the driver balance immediately.
    pub async fn add_expense(&self, owner: ExpenseOwner, input: NewExpense) -> ResultEngine<Expense> {
        let now = self.clock.now();
        let expense = match owner {
            ExpenseOwner::Flight { flight_id } => {
                let _guard = self.locks.lock(flight_id).await;
                let mut flight = self.repository.load_flight(flight_id).await?;
                let expense = flight.add_expense(input, self.base_currency, now)?.clone();
                flight.version += 1;
                self.repository.save(Changes::default().flight(&flight)).await?;
                expense
            }
            ExpenseOwner::Driver { driver_id } => {
                let _guard = self.locks.lock(driver_id).await;
                let mut driver = self.repository.load_driver(driver_id).await?;
                driver.ensure_active()?;
                let expense = ledger::build_expense(owner, input, self.base_currency, now)?;
                debt::apply_pre_flight_expense(&mut driver, &expense, now)?;
                driver.expenses.push(expense.clone());
                driver.version += 1;
                self.repository.save(Changes::default().driver(&driver)).await?;
                expense
            }
        };

        self.emit(EngineEvent::ExpenseAdded {
            expense: expense.clone(),
        });
        Ok(expense)
    }

    /// Correct an expense while its owner still accepts changes.
    pub async fn edit_expense(&self, expense_id: Uuid, patch: ExpensePatch) -> ResultEngine<Expense> {
        let now = self.clock.now();
        let expense = match self.repository.expense_owner(expense_id).await? {
            ExpenseOwner::Flight { flight_id } => {
                let _guard = self.locks.lock(flight_id).await;
                let mut flight = self.repository.load_flight(flight_id).await?;
                let expense = flight
                    .edit_expense(expense_id, patch, self.base_currency, now)?
                    .clone();
                flight.version += 1;
                self.repository.save(Changes::default().flight(&flight)).await?;
                expense
            }
            ExpenseOwner::Driver { driver_id } => {
                let _guard = self.locks.lock(driver_id).await;
                let mut driver = self.repository.load_driver(driver_id).await?;
                driver.ensure_active()?;
                let entry = ledger::find_mut(&mut driver.expenses, expense_id)?;
                let old_base_minor = entry.base_amount_minor;
                ledger::apply_patch(entry, patch, self.base_currency, now)?;
                let expense = entry.clone();
                debt::apply_pocket_correction(
                    &mut driver,
                    expense_id,
                    old_base_minor,
                    expense.base_amount_minor,
                    now,
                )?;
                driver.version += 1;
                self.repository.save(Changes::default().driver(&driver)).await?;
                expense
            }
        };

        self.emit(EngineEvent::ExpenseUpdated {
            expense: expense.clone(),
        });
        Ok(expense)
    }

    /// Delete an expense while its owner still accepts changes.
    pub async fn remove_expense(&self, expense_id: Uuid) -> ResultEngine<Expense> {
        let now = self.clock.now();
        let expense = match self.repository.expense_owner(expense_id).await? {
            ExpenseOwner::Flight { flight_id } => {
                let _guard = self.locks.lock(flight_id).await;
                let mut flight = self.repository.load_flight(flight_id).await?;
                let expense = flight.remove_expense(expense_id)?;
                flight.version += 1;
                self.repository.save(Changes::default().flight(&flight)).await?;
                expense
            }
            ExpenseOwner::Driver { driver_id } => {
                let _guard = self.locks.lock(driver_id).await;
                let mut driver = self.repository.load_driver(driver_id).await?;
                driver.ensure_active()?;
                let expense = ledger::remove(&mut driver.expenses, expense_id)?;
                debt::apply_pocket_correction(
                    &mut driver,
                    expense_id,
                    expense.base_amount_minor,
                    0,
                    now,
                )?;
                driver.version += 1;
                self.repository.save(Changes::default().driver(&driver)).await?;
                expense
            }
        };

        self.emit(EngineEvent::ExpenseRemoved {
            expense: expense.clone(),
        });
        Ok(expense)
    }

    /// Expenses of a flight or a driver's pocket, in entry order.
    pub async fn expenses(&self, owner: ExpenseOwner) -> ResultEngine<Vec<Expense>> {
        Ok(match owner {
            ExpenseOwner::Flight { flight_id } => {
                self.repository.load_flight(flight_id).await?.expenses
            }
            ExpenseOwner::Driver { driver_id } => {
                self.repository.load_driver(driver_id).await?.expenses
            }
        })
    }

    /// Base-currency total of the owner's expenses matching `filter`.
    pub async fn expense_total(
        &self,
        owner: ExpenseOwner,
        filter: &ExpenseFilter,
    ) -> ResultEngine<i64> {
        let expenses = self.expenses(owner).await?;
        ledger::total_for(&expenses, filter)
    }
}
