use crate::infra::{
    builtin_colonies, InMemoryEventLog, InMemoryHistoryRepository, InMemoryOtpStore,
    InMemoryUserRepository, RecordingOtpSender,
};
use chrono::Utc;
use clap::Args;
use delhi_duty::accounts::AccountService;
use delhi_duty::colonies::ColonyDirectory;
use delhi_duty::error::AppError;
use delhi_duty::rates::RateSchedule;
use delhi_duty::valuation::{
    ConstructionDetails, DdaValuationOutcome, DdaValuationRequest, OwnershipType, PropertyUse,
    RateCategory, ValuationOutcome, ValuationRequest, ValuationService,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CalcArgs {
    /// Property use: residential or commercial
    #[arg(long, value_parser = crate::infra::parse_use, default_value = "residential")]
    pub(crate) property_use: PropertyUse,
    /// Colony name; the category is resolved from the directory
    #[arg(long)]
    pub(crate) colony: Option<String>,
    /// Manual rate category A-H, when no colony is given
    #[arg(long, value_parser = crate::infra::parse_category)]
    pub(crate) category: Option<RateCategory>,
    /// Land area in square yards
    #[arg(long)]
    pub(crate) land_area: f64,
    /// Buyer type: male, female or joint
    #[arg(long, value_parser = crate::infra::parse_ownership, default_value = "male")]
    pub(crate) ownership: OwnershipType,
    /// Total storeys of the building
    #[arg(long, default_value_t = 1)]
    pub(crate) total_storeys: u32,
    /// Storeys being purchased
    #[arg(long, default_value_t = 1)]
    pub(crate) storeys_purchased: u32,
    /// Parking is included in the sale
    #[arg(long)]
    pub(crate) parking: bool,
    /// Constructed area in square yards (requires --year-built)
    #[arg(long, requires = "year_built")]
    pub(crate) constructed_area: Option<f64>,
    /// Year of construction (requires --constructed-area)
    #[arg(long, requires = "constructed_area")]
    pub(crate) year_built: Option<i32>,
    /// Declared consideration overriding the computed value
    #[arg(long)]
    pub(crate) custom_consideration: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct DdaArgs {
    /// Property use: residential or commercial
    #[arg(long, value_parser = crate::infra::parse_use, default_value = "residential")]
    pub(crate) property_use: PropertyUse,
    /// Plinth area in square yards
    #[arg(long)]
    pub(crate) plinth_area: f64,
    /// The building has more than four storeys
    #[arg(long)]
    pub(crate) more_than_four_storeys: bool,
    /// Buyer type: male, female or joint
    #[arg(long, value_parser = crate::infra::parse_ownership, default_value = "male")]
    pub(crate) ownership: OwnershipType,
    /// Declared consideration for a side-by-side comparison
    #[arg(long)]
    pub(crate) custom_consideration: Option<f64>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the account signup/login portion of the demo
    #[arg(long)]
    pub(crate) skip_accounts: bool,
}

fn demo_service(
    colonies: ColonyDirectory,
) -> ValuationService<InMemoryHistoryRepository, InMemoryEventLog> {
    ValuationService::new(
        Arc::new(RateSchedule::statutory()),
        Arc::new(colonies),
        Arc::new(InMemoryHistoryRepository::default()),
        Arc::new(InMemoryEventLog::default()),
    )
}

pub(crate) fn run_calc(args: CalcArgs) -> Result<(), AppError> {
    let service = demo_service(builtin_colonies()?);

    let construction = match (args.constructed_area, args.year_built) {
        (Some(constructed_area_sq_yards), Some(year_built)) => Some(ConstructionDetails {
            constructed_area_sq_yards,
            year_built,
        }),
        _ => None,
    };

    let request = ValuationRequest {
        property_use: args.property_use,
        colony: args.colony,
        category: args.category,
        land_area_sq_yards: args.land_area,
        ownership: args.ownership,
        total_storeys: args.total_storeys,
        storeys_purchased: args.storeys_purchased,
        has_parking: args.parking,
        construction,
        custom_consideration: args.custom_consideration,
        actor: None,
    };

    match service.calculate(&request, Utc::now()) {
        Ok(outcome) => {
            render_valuation(&outcome, args.land_area);
            Ok(())
        }
        Err(err) => {
            println!("Calculation rejected: {err}");
            Ok(())
        }
    }
}

pub(crate) fn run_dda(args: DdaArgs) -> Result<(), AppError> {
    let service = demo_service(builtin_colonies()?);

    let request = DdaValuationRequest {
        property_use: args.property_use,
        plinth_area_sq_yards: args.plinth_area,
        more_than_four_storeys: args.more_than_four_storeys,
        ownership: args.ownership,
        custom_consideration: args.custom_consideration,
        actor: None,
    };

    match service.calculate_dda(&request, Utc::now()) {
        Ok(outcome) => {
            render_dda(&outcome, args.plinth_area);
            Ok(())
        }
        Err(err) => {
            println!("Calculation rejected: {err}");
            Ok(())
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Delhi duty calculator demo");

    let service = demo_service(builtin_colonies()?);

    println!("\nPlotted residential sale (colony lookup)");
    let request = ValuationRequest {
        property_use: PropertyUse::Residential,
        colony: Some("Lajpat Nagar".to_string()),
        category: None,
        land_area_sq_yards: 50.0,
        ownership: OwnershipType::Female,
        total_storeys: 2,
        storeys_purchased: 1,
        has_parking: true,
        construction: Some(ConstructionDetails {
            constructed_area_sq_yards: 45.0,
            year_built: 1998,
        }),
        custom_consideration: None,
        actor: None,
    };
    match service.calculate(&request, Utc::now()) {
        Ok(outcome) => render_valuation(&outcome, request.land_area_sq_yards),
        Err(err) => println!("  rejected: {err}"),
    }

    println!("\nDDA/CGHS flat, more than four storeys");
    let dda_request = DdaValuationRequest {
        property_use: PropertyUse::Residential,
        plinth_area_sq_yards: 100.0,
        more_than_four_storeys: true,
        ownership: OwnershipType::Male,
        custom_consideration: Some(9_000_000.0),
        actor: None,
    };
    match service.calculate_dda(&dda_request, Utc::now()) {
        Ok(outcome) => render_dda(&outcome, dda_request.plinth_area_sq_yards),
        Err(err) => println!("  rejected: {err}"),
    }

    if args.skip_accounts {
        return Ok(());
    }

    println!("\nAccount flow (OTP codes captured locally, not emailed)");
    let users = Arc::new(InMemoryUserRepository::default());
    let otps = Arc::new(InMemoryOtpStore::default());
    let sender = Arc::new(RecordingOtpSender::default());
    let accounts = AccountService::new(users, otps, sender.clone());

    let now = Utc::now();
    let email = "demo@example.in";
    if let Err(err) = accounts.begin_signup(email, "demo", now) {
        println!("  signup rejected: {err}");
        return Ok(());
    }
    let Some(code) = sender.last_code_for(email) else {
        println!("  no OTP captured");
        return Ok(());
    };
    println!("- OTP issued to {email}");

    match accounts.confirm_signup(email, "demo", &code, "hunter2", now) {
        Ok(account) => println!("- account {} created", account.id.0),
        Err(err) => {
            println!("  confirmation failed: {err}");
            return Ok(());
        }
    }

    match accounts.login("demo", "hunter2", now) {
        Ok(account) => println!("- login ok, last seen {:?}", account.last_login),
        Err(err) => println!("  login failed: {err}"),
    }

    Ok(())
}

fn render_valuation(outcome: &ValuationOutcome, land_area_sq_yards: f64) {
    println!("--- Property Calculation Summary ---");
    if let Some(colony) = &outcome.colony_name {
        println!("Colony: {colony}");
    }
    println!("Property Type: {}", outcome.property_use.label());
    println!("Category: {}", outcome.category);
    println!(
        "Land Area: {land_area_sq_yards} sq yd ({:.2} sq m)",
        outcome.result.land_area_sq_meters
    );
    println!("Land Value: {}", rupees(outcome.result.land_value_for_share));
    println!(
        "Construction Value: {}",
        rupees(outcome.result.construction_value)
    );
    println!("Parking Cost: {}", rupees(outcome.result.parking_cost));
    println!(
        "Final Consideration: {}",
        rupees(outcome.result.final_consideration)
    );
    render_duty_lines(&outcome.result.duty);
}

fn render_dda(outcome: &DdaValuationOutcome, plinth_area_sq_yards: f64) {
    println!("--- DDA/CGHS Flat Summary ---");
    println!("Usage: {}", outcome.property_use.label());
    println!(
        "Plinth Area: {plinth_area_sq_yards} sq yd ({:.2} sq m)",
        outcome.result.plinth_area_sq_meters
    );
    match outcome.result.bracket {
        Some(bracket) => println!("Slab: {}", bracket.label()),
        None => println!("Slab: uniform rate (more than four storeys)"),
    }
    println!(
        "Rate: {} per sq m",
        rupees(outcome.result.rate_per_sq_meter)
    );
    println!(
        "Minimum Govt Value: {}",
        rupees(outcome.result.government_value)
    );
    render_duty_lines(&outcome.result.government_duty);

    if let Some(declared) = &outcome.result.declared {
        println!("--- On Declared Value {} ---", rupees(declared.consideration));
        render_duty_lines(&declared.duty);
    }
}

fn render_duty_lines(duty: &delhi_duty::valuation::DutySummary) {
    println!(
        "Stamp Duty Rate: {:.2}%",
        duty.stamp_duty_rate * 100.0
    );
    println!("Stamp Duty: {}", rupees(duty.stamp_duty));
    println!("Mutation Fee: {}", rupees(duty.mutation_fee));
    println!("E-Fees: {}", rupees(duty.e_fees));
    if duty.tds > 0.0 {
        println!("TDS (1% over Rs 50L): {}", rupees(duty.tds));
    } else {
        println!("TDS: not applicable");
    }
    println!("Total Govt Duty: {}", rupees(duty.total_payable));
}

/// Display helper: round up to whole rupees and group thousands.
fn rupees(value: f64) -> String {
    let whole = value.ceil() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (position, digit) in digits.chars().rev().enumerate() {
        if position > 0 && position % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let grouped: String = grouped.chars().rev().collect();
    if whole < 0 {
        format!("Rs -{grouped}")
    } else {
        format!("Rs {grouped}")
    }
}
