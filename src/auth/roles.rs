use serde::{Deserialize, Serialize};

/// Account roles. Each role owns its own account partition (table); an
/// unrecognized role tag falls through to the generic `users` partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    SchoolSupervisor,
    HostSupervisor,
    Admin,
    #[serde(other)]
    Generic,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::SchoolSupervisor => "school_supervisor",
            Role::HostSupervisor => "host_supervisor",
            Role::Admin => "admin",
            Role::Generic => "generic",
        }
    }

    pub fn parse(tag: &str) -> Role {
        match tag {
            "student" => Role::Student,
            "school_supervisor" => Role::SchoolSupervisor,
            "host_supervisor" => Role::HostSupervisor,
            "admin" => Role::Admin,
            _ => Role::Generic,
        }
    }

    /// The partition backing this role. Adding a role means adding a row to
    /// `PARTITIONS`, not another branch.
    pub fn partition(self) -> &'static RolePartition {
        &PARTITIONS[self as usize]
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-role account partition: which table backs the role, how its columns
/// project onto the common account row shape, and which columns a profile
/// update may touch.
#[derive(Debug)]
pub struct RolePartition {
    pub role: Role,
    pub table: &'static str,
    /// SELECT projection aligning this partition's columns onto `AccountRow`;
    /// columns a partition lacks are projected as typed NULLs.
    pub account_columns: &'static str,
    /// Profile columns this partition allows a patch to overwrite
    pub patch_columns: &'static [&'static str],
}

// Indexed by `Role` discriminant; keep the order in sync with the enum.
static PARTITIONS: [RolePartition; 5] = [
    RolePartition {
        role: Role::Student,
        table: "students",
        account_columns: "id, name, email, role, password, phone, course, student_id, \
                          NULL::text AS department, school_supervisor_id, created_at",
        patch_columns: &["name", "email", "phone", "course", "student_id"],
    },
    RolePartition {
        role: Role::SchoolSupervisor,
        table: "school_supervisor",
        account_columns: "id, name, email, role, password, phone, NULL::text AS course, \
                          NULL::text AS student_id, department, \
                          NULL::integer AS school_supervisor_id, created_at",
        patch_columns: &["name", "email", "phone", "department"],
    },
    RolePartition {
        role: Role::HostSupervisor,
        table: "host_supervisor",
        account_columns: "id, name, email, role, password, phone, NULL::text AS course, \
                          NULL::text AS student_id, NULL::text AS department, \
                          NULL::integer AS school_supervisor_id, created_at",
        patch_columns: &["name", "email", "phone"],
    },
    RolePartition {
        role: Role::Admin,
        table: "admin",
        account_columns: "id, name, email, role, password, NULL::text AS phone, \
                          NULL::text AS course, NULL::text AS student_id, \
                          NULL::text AS department, NULL::integer AS school_supervisor_id, \
                          created_at",
        patch_columns: &["name", "email"],
    },
    RolePartition {
        role: Role::Generic,
        table: "users",
        account_columns: "id, name, email, role, password, phone, NULL::text AS course, \
                          NULL::text AS student_id, NULL::text AS department, \
                          NULL::integer AS school_supervisor_id, created_at",
        patch_columns: &["name", "email", "phone"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_lookup_matches_role() {
        for role in [
            Role::Student,
            Role::SchoolSupervisor,
            Role::HostSupervisor,
            Role::Admin,
            Role::Generic,
        ] {
            assert_eq!(role.partition().role, role);
        }
    }

    #[test]
    fn role_partition_tables() {
        assert_eq!(Role::Student.partition().table, "students");
        assert_eq!(Role::Admin.partition().table, "admin");
        assert_eq!(Role::Generic.partition().table, "users");
    }

    #[test]
    fn unknown_tags_fall_through_to_generic() {
        assert_eq!(Role::parse("staff"), Role::Generic);
        assert_eq!(Role::parse(""), Role::Generic);
        assert_eq!(Role::parse("host_supervisor"), Role::HostSupervisor);
    }

    #[test]
    fn deserializes_unknown_role_as_generic() {
        let role: Role = serde_json::from_str("\"intern\"").unwrap();
        assert_eq!(role, Role::Generic);
        let role: Role = serde_json::from_str("\"school_supervisor\"").unwrap();
        assert_eq!(role, Role::SchoolSupervisor);
    }
}
