//! Sample data for a fresh installation
//!
//! Five municipal departments with their classifier keywords, one worker per
//! department, an administrator and a citizen account.

use sqlx::SqlitePool;
use tracing::info;

use crate::api::auth::hash_password;
use crate::db::departments::{insert_department, NewDepartment};
use crate::db::users::{insert_user, NewUser};
use crate::db::workers::{insert_worker, NewWorker};
use crate::Result;

/// Mobile number of the seeded administrator
pub const SAMPLE_ADMIN_MOBILE: &str = "+919999999999";

/// Mobile number of the seeded citizen
pub const SAMPLE_CITIZEN_MOBILE: &str = "+919888888888";

struct DepartmentSeed {
    name: &'static str,
    description: &'static str,
    keywords: &'static str,
    contact_email: &'static str,
    contact_phone: &'static str,
}

const DEPARTMENTS: [DepartmentSeed; 5] = [
    DepartmentSeed {
        name: "Water Department",
        description: "Handles water supply, drainage, and related issues",
        keywords: "water,pipe,leak,drainage,sewage,tap,supply,pressure,contamination",
        contact_email: "water@civic.local",
        contact_phone: "+911234567890",
    },
    DepartmentSeed {
        name: "Electricity Department",
        description: "Manages electrical infrastructure and power issues",
        keywords: "electricity,power,outage,transformer,pole,wire,streetlight,meter",
        contact_email: "electricity@civic.local",
        contact_phone: "+911234567891",
    },
    DepartmentSeed {
        name: "Roads & Transportation",
        description: "Road maintenance, traffic management, and transportation",
        keywords: "road,pothole,traffic,signal,maintenance,construction,parking,footpath",
        contact_email: "roads@civic.local",
        contact_phone: "+911234567892",
    },
    DepartmentSeed {
        name: "Waste Management",
        description: "Garbage collection, waste disposal, and cleanliness",
        keywords: "garbage,waste,trash,cleaning,dustbin,disposal,sanitation,sweeping",
        contact_email: "waste@civic.local",
        contact_phone: "+911234567893",
    },
    DepartmentSeed {
        name: "Public Safety",
        description: "Law and order, security, and emergency services",
        keywords: "safety,security,crime,emergency,police,fire,ambulance,accident",
        contact_email: "safety@civic.local",
        contact_phone: "+911234567894",
    },
];

// (name, employee id, mobile, specialization), one per department in order
const WORKERS: [(&str, &str, &str, &str); 5] = [
    ("Raj Kumar", "WTR001", "+919876543210", "Plumbing"),
    ("Amit Singh", "ELC001", "+919876543211", "Electrical"),
    ("Priya Sharma", "RDS001", "+919876543212", "Road Maintenance"),
    ("Suresh Gupta", "WST001", "+919876543213", "Waste Collection"),
    ("Vikram Yadav", "SFT001", "+919876543214", "Security"),
];

/// Insert sample data unless departments already exist
///
/// Returns `true` when data was inserted.
pub async fn seed_sample_data(pool: &SqlitePool) -> Result<bool> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Sample data already exists, skipping");
        return Ok(false);
    }

    let mut department_ids = Vec::with_capacity(DEPARTMENTS.len());
    for seed in &DEPARTMENTS {
        let department = NewDepartment {
            name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            keywords: Some(seed.keywords.to_string()),
            contact_email: Some(seed.contact_email.to_string()),
            contact_phone: Some(seed.contact_phone.to_string()),
        };
        department_ids.push(insert_department(pool, &department).await?);
    }

    for ((name, employee_id, mobile, specialization), department_id) in
        WORKERS.iter().zip(&department_ids)
    {
        let worker = NewWorker {
            name: name.to_string(),
            employee_id: employee_id.to_string(),
            mobile_number: mobile.to_string(),
            email: None,
            department_id: *department_id,
            specialization: Some(specialization.to_string()),
        };
        insert_worker(pool, &worker).await?;
    }

    let admin = sample_user(
        SAMPLE_ADMIN_MOBILE,
        "Admin User",
        "admin@civic.local",
        "Municipal Corporation Office",
        true,
        "admin123",
    )?;
    insert_user(pool, &admin).await?;

    let citizen = sample_user(
        SAMPLE_CITIZEN_MOBILE,
        "John Doe",
        "john@example.com",
        "123 Main Street, City",
        false,
        "citizen123",
    )?;
    insert_user(pool, &citizen).await?;

    info!(
        "Sample data created: {} departments, {} workers, admin login {}",
        DEPARTMENTS.len(),
        WORKERS.len(),
        SAMPLE_ADMIN_MOBILE
    );
    Ok(true)
}

fn sample_user(
    mobile: &str,
    name: &str,
    email: &str,
    address: &str,
    is_admin: bool,
    password: &str,
) -> Result<NewUser> {
    Ok(NewUser {
        mobile_number: mobile.to_string(),
        name: name.to_string(),
        email: Some(email.to_string()),
        address: Some(address.to_string()),
        is_admin,
        password_hash: hash_password(password)?,
    })
}
