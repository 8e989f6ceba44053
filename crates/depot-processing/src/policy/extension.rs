use depot_core::UploadSettings;

use super::PolicyContext;
use crate::error::UploadError;
use crate::inspector::IMAGE_EXTENSIONS;

const WILDCARD: &str = "*";

/// Named predicates of the authorization chain, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionRule {
    /// `*` in the general list authorizes everything.
    GeneralWildcard,
    /// Staff may attach anything to private messages when the site allows it.
    StaffPrivateMessageOverride,
    /// Staff fall back to their extended list (which may itself be `*`).
    StaffExtended,
    /// Admins may upload any image for a site setting.
    SiteSettingImage,
    GeneralList,
}

impl ExtensionRule {
    pub const CHAIN: [ExtensionRule; 5] = [
        ExtensionRule::GeneralWildcard,
        ExtensionRule::StaffPrivateMessageOverride,
        ExtensionRule::StaffExtended,
        ExtensionRule::SiteSettingImage,
        ExtensionRule::GeneralList,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExtensionRule::GeneralWildcard => "general_wildcard",
            ExtensionRule::StaffPrivateMessageOverride => "staff_pm_override",
            ExtensionRule::StaffExtended => "staff_extended",
            ExtensionRule::SiteSettingImage => "site_setting_image",
            ExtensionRule::GeneralList => "general_list",
        }
    }

    fn permits(self, policy: &ExtensionPolicy, extension: &str, ctx: &PolicyContext) -> bool {
        match self {
            ExtensionRule::GeneralWildcard => contains(&policy.general, WILDCARD),
            ExtensionRule::StaffPrivateMessageOverride => {
                ctx.role.is_staff() && ctx.for_private_message && policy.staff_any_in_pm
            }
            ExtensionRule::StaffExtended => {
                ctx.role.is_staff()
                    && (contains(&policy.staff, WILDCARD) || contains(&policy.staff, extension))
            }
            ExtensionRule::SiteSettingImage => {
                ctx.role.is_admin() && ctx.for_site_setting && ctx.is_image
            }
            ExtensionRule::GeneralList => contains(&policy.general, extension),
        }
    }
}

/// Decides whether an extension may be uploaded by a given caller for a given purpose.
#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    general: Vec<String>,
    staff: Vec<String>,
    staff_any_in_pm: bool,
    allow_uploaded_avatars: bool,
    external_avatars_override: bool,
}

impl ExtensionPolicy {
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            general: settings.authorized_extensions.clone(),
            staff: settings.authorized_extensions_for_staff.clone(),
            staff_any_in_pm: settings.allow_staff_to_upload_any_file_in_pm,
            allow_uploaded_avatars: settings.allow_uploaded_avatars,
            external_avatars_override: settings.external_avatars_override,
        }
    }

    /// Purpose gate followed by the extension chain.
    pub fn authorize(
        &self,
        extension: &str,
        ctx: &PolicyContext,
    ) -> Result<ExtensionRule, UploadError> {
        self.check_purpose(extension, ctx)?;
        self.check(extension, ctx)
    }

    /// Rules tied to the declared purpose rather than to the extension lists.
    ///
    /// Non-admin avatar uploads need `allow_uploaded_avatars` and are blocked outright by
    /// `external_avatars_override`. Image-only purposes reject everything else.
    pub fn check_purpose(&self, extension: &str, ctx: &PolicyContext) -> Result<(), UploadError> {
        if ctx.purpose.is_avatar()
            && !ctx.role.is_admin()
            && (!self.allow_uploaded_avatars || self.external_avatars_override)
        {
            return Err(UploadError::AvatarUploadsDisabled);
        }

        if ctx.purpose.requires_image() && !ctx.is_image {
            return Err(UploadError::Unauthorized {
                extension: extension.to_string(),
                allowed: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            });
        }

        Ok(())
    }

    /// Walk the chain; the first permitting rule wins.
    pub fn check(&self, extension: &str, ctx: &PolicyContext) -> Result<ExtensionRule, UploadError> {
        let extension = extension.to_lowercase();

        if let Some(rule) = ExtensionRule::CHAIN
            .into_iter()
            .find(|rule| rule.permits(self, &extension, ctx))
        {
            tracing::debug!(extension = %extension, rule = rule.name(), "Extension authorized");
            return Ok(rule);
        }

        Err(UploadError::Unauthorized {
            extension,
            allowed: self.visible_extensions(ctx),
        })
    }

    /// Extensions named in the rejection message: the general list, plus the staff list
    /// for staff callers.
    pub fn visible_extensions(&self, ctx: &PolicyContext) -> Vec<String> {
        let mut visible = self.general.clone();
        if ctx.role.is_staff() {
            for extension in &self.staff {
                if !visible.contains(extension) {
                    visible.push(extension.clone());
                }
            }
        }
        visible
    }
}

fn contains(list: &[String], extension: &str) -> bool {
    list.iter().any(|entry| entry == extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::models::{Role, UploadPurpose};

    fn settings(general: &[&str], staff: &[&str]) -> UploadSettings {
        UploadSettings {
            authorized_extensions: general.iter().map(|e| e.to_string()).collect(),
            authorized_extensions_for_staff: staff.iter().map(|e| e.to_string()).collect(),
            ..UploadSettings::default()
        }
    }

    fn ctx(role: Role, purpose: UploadPurpose, is_image: bool) -> PolicyContext {
        PolicyContext {
            role,
            purpose,
            for_private_message: false,
            for_site_setting: false,
            is_image,
        }
    }

    #[test]
    fn test_wildcard_authorizes_anything() {
        let policy = ExtensionPolicy::from_settings(&settings(&["*"], &[]));
        let rule = policy
            .check("exe", &ctx(Role::Regular, UploadPurpose::Composer, false))
            .unwrap();
        assert_eq!(rule, ExtensionRule::GeneralWildcard);
        assert!(policy
            .check("", &ctx(Role::Anonymous, UploadPurpose::Composer, false))
            .is_ok());
    }

    #[test]
    fn test_general_list_is_case_insensitive() {
        let policy = ExtensionPolicy::from_settings(&settings(&["png"], &[]));
        let rule = policy
            .check("PNG", &ctx(Role::Regular, UploadPurpose::Composer, true))
            .unwrap();
        assert_eq!(rule, ExtensionRule::GeneralList);
    }

    #[test]
    fn test_staff_wildcard_with_empty_general_list() {
        let policy = ExtensionPolicy::from_settings(&settings(&[], &["*"]));

        let rule = policy
            .check("zip", &ctx(Role::Moderator, UploadPurpose::Composer, false))
            .unwrap();
        assert_eq!(rule, ExtensionRule::StaffExtended);

        match policy.check("zip", &ctx(Role::Regular, UploadPurpose::Composer, false)) {
            Err(UploadError::Unauthorized { extension, allowed }) => {
                assert_eq!(extension, "zip");
                assert!(allowed.is_empty());
            }
            other => panic!("Expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_rejection_lists_staff_extensions_for_staff_only() {
        let policy = ExtensionPolicy::from_settings(&settings(&["png", "jpg"], &["pdf", "png"]));

        let staff = policy.visible_extensions(&ctx(Role::Admin, UploadPurpose::Composer, false));
        assert_eq!(staff, vec!["png", "jpg", "pdf"]);

        let regular =
            policy.visible_extensions(&ctx(Role::Regular, UploadPurpose::Composer, false));
        assert_eq!(regular, vec!["png", "jpg"]);
    }

    #[test]
    fn test_staff_private_message_override() {
        let mut site = settings(&["png"], &[]);
        site.allow_staff_to_upload_any_file_in_pm = true;
        let policy = ExtensionPolicy::from_settings(&site);

        let mut pm = ctx(Role::Moderator, UploadPurpose::Composer, false);
        pm.for_private_message = true;
        assert_eq!(
            policy.check("tar", &pm).unwrap(),
            ExtensionRule::StaffPrivateMessageOverride
        );

        pm.role = Role::Regular;
        assert!(policy.check("tar", &pm).is_err());

        pm.role = Role::Moderator;
        pm.for_private_message = false;
        assert!(policy.check("tar", &pm).is_err());
    }

    #[test]
    fn test_site_setting_images_for_admins() {
        let policy = ExtensionPolicy::from_settings(&settings(&["pdf"], &[]));

        let mut site_setting = ctx(Role::Admin, UploadPurpose::SiteSetting, true);
        site_setting.for_site_setting = true;
        assert_eq!(
            policy.check("png", &site_setting).unwrap(),
            ExtensionRule::SiteSettingImage
        );

        let mut document = site_setting;
        document.is_image = false;
        assert!(policy.check("docx", &document).is_err());

        site_setting.role = Role::Moderator;
        assert!(policy.check("png", &site_setting).is_err());
    }

    #[test]
    fn test_avatar_gate() {
        let mut site = settings(&["png"], &[]);
        site.allow_uploaded_avatars = false;
        let policy = ExtensionPolicy::from_settings(&site);

        let regular = ctx(Role::Regular, UploadPurpose::Avatar, true);
        assert!(matches!(
            policy.authorize("png", &regular),
            Err(UploadError::AvatarUploadsDisabled)
        ));

        let admin = ctx(Role::Admin, UploadPurpose::Avatar, true);
        assert!(policy.authorize("png", &admin).is_ok());
    }

    #[test]
    fn test_external_avatars_override_blocks_non_admins() {
        let mut site = settings(&["png"], &[]);
        site.external_avatars_override = true;
        let policy = ExtensionPolicy::from_settings(&site);

        assert!(matches!(
            policy.authorize("png", &ctx(Role::Moderator, UploadPurpose::Avatar, true)),
            Err(UploadError::AvatarUploadsDisabled)
        ));
        assert!(policy
            .authorize("png", &ctx(Role::Admin, UploadPurpose::Avatar, true))
            .is_ok());
    }

    #[test]
    fn test_image_only_purposes_reject_attachments() {
        let policy = ExtensionPolicy::from_settings(&settings(&["*"], &[]));
        for purpose in [
            UploadPurpose::Avatar,
            UploadPurpose::ProfileBackground,
            UploadPurpose::CardBackground,
            UploadPurpose::SiteSetting,
        ] {
            let result = policy.authorize("pdf", &ctx(Role::Admin, purpose, false));
            assert!(
                matches!(result, Err(UploadError::Unauthorized { .. })),
                "{} should only accept images",
                purpose
            );
        }
        assert!(policy
            .authorize("pdf", &ctx(Role::Regular, UploadPurpose::Composer, false))
            .is_ok());
    }
}
